//! Change notifications for row models.
//!
//! A row model owns one [`Signal`] per kind of change (model updated, filter
//! changed, expansion toggled, warnings). Listeners are typed by the payload
//! they receive, so a listener registered for sort changes never sees a
//! warning.
//!
//! Listeners run synchronously on the thread that calls [`Signal::emit`], in
//! the order they were registered. Emission works on a snapshot of the
//! listener list: a listener is free to register or remove listeners,
//! including itself, and the change takes effect from the next emission.
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! let rows_removed = Signal::<Vec<String>>::new();
//! let id = rows_removed.connect(|ids| {
//!     println!("removed {} rows", ids.len());
//! });
//!
//! rows_removed.emit(vec!["7".to_string(), "9".to_string()]);
//! assert!(rows_removed.disconnect(id));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to a registered listener, returned by [`Signal::connect`].
    pub struct ConnectionId;
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of listeners that all receive each emitted payload of type `T`.
///
/// Use `()` for notifications without a payload.
pub struct Signal<T> {
    listeners: Mutex<SlotMap<ConnectionId, Listener<T>>>,
    muted: AtomicBool,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.connection_count())
            .field("muted", &self.is_blocked())
            .finish()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(SlotMap::with_key()),
            muted: AtomicBool::new(false),
        }
    }

    /// Registers `listener` and returns the handle that removes it again.
    pub fn connect<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.listeners.lock().insert(Arc::new(listener));
        tracing::trace!(target: targets::SIGNAL, ?id, "listener connected");
        id
    }

    /// Registers `listener` for as long as the returned guard lives.
    ///
    /// ```
    /// use horizon_grid_core::Signal;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let expanded = Signal::<(String, bool)>::new();
    /// let seen = Arc::new(AtomicUsize::new(0));
    /// {
    ///     let seen = seen.clone();
    ///     let _guard = expanded.connect_scoped(move |_| {
    ///         seen.fetch_add(1, Ordering::SeqCst);
    ///     });
    ///     expanded.emit(("row-group-country-US".to_string(), true));
    /// }
    /// expanded.emit(("row-group-country-US".to_string(), false));
    /// assert_eq!(seen.load(Ordering::SeqCst), 1);
    /// ```
    pub fn connect_scoped<F>(&self, listener: F) -> ConnectionGuard<'_, T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(listener),
            signal: self,
        }
    }

    /// Removes one listener. Returns `false` when `id` was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.listeners.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.listeners.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Mutes or unmutes the signal. Payloads emitted while muted are dropped,
    /// not queued.
    pub fn set_blocked(&self, blocked: bool) {
        self.muted.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Delivers `payload` to every listener registered at the time of the call.
    pub fn emit(&self, payload: T) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "muted, payload dropped");
            return;
        }

        let snapshot: Vec<Listener<T>> = {
            let listeners = self.listeners.lock();
            listeners.values().map(Arc::clone).collect()
        };
        tracing::trace!(target: targets::SIGNAL, listeners = snapshot.len(), "emit");

        snapshot.iter().for_each(|listener| listener(&payload));
    }
}

/// Removes its listener from the signal when dropped.
///
/// Returned by [`Signal::connect_scoped`]. Borrowing the signal keeps the
/// guard from outliving it.
pub struct ConnectionGuard<'a, T> {
    signal: &'a Signal<T>,
    id: ConnectionId,
}

impl<T> ConnectionGuard<'_, T> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<T> Drop for ConnectionGuard<'_, T> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}
