//! Typed notification channels of the row model.

use horizon_grid_core::Signal;

use super::context::GridWarning;
use super::steps::RefreshStep;

/// Payload of [`RowModelSignals::model_updated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelUpdate {
    /// The step the refresh started at.
    pub step: RefreshStep,
    /// Number of displayed rows after the refresh.
    pub displayed_row_count: usize,
    /// Data generation the display belongs to.
    pub generation: u64,
}

/// Signals emitted by a row model.
///
/// One signal per concern; a view connects only to what it renders.
pub struct RowModelSignals {
    // -------------------------------------------------------------------------
    // Display signals
    // -------------------------------------------------------------------------
    /// Emitted after every refresh that reached the flatten stage.
    pub model_updated: Signal<ModelUpdate>,

    /// Emitted when a group is expanded or collapsed.
    /// Args: (row id, expanded)
    pub expanded_changed: Signal<(String, bool)>,

    // -------------------------------------------------------------------------
    // Data signals
    // -------------------------------------------------------------------------
    /// Emitted after the records are replaced or a transaction is applied.
    pub row_data_changed: Signal<()>,

    /// Emitted when the filter model or quick filter changes.
    pub filter_changed: Signal<()>,

    /// Emitted when the sort model changes.
    pub sort_changed: Signal<()>,

    /// Emitted when the set of pivot result columns changes.
    /// Args: the new pivot result column ids
    pub pivot_columns_changed: Signal<Vec<String>>,

    /// Emitted when the selection changes.
    /// Args: ids of the selected rows
    pub selection_changed: Signal<Vec<String>>,

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------
    /// Emitted for every non-fatal problem (dropped transaction items, stale
    /// transactions, unknown sort columns).
    pub warning: Signal<GridWarning>,
}

impl Default for RowModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RowModelSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowModelSignals").finish_non_exhaustive()
    }
}

impl RowModelSignals {
    /// Creates a new set of signals.
    pub fn new() -> Self {
        Self {
            model_updated: Signal::new(),
            expanded_changed: Signal::new(),
            row_data_changed: Signal::new(),
            filter_changed: Signal::new(),
            sort_changed: Signal::new(),
            pivot_columns_changed: Signal::new(),
            selection_changed: Signal::new(),
            warning: Signal::new(),
        }
    }

    /// Blocks or unblocks every data and display signal. Warnings are never
    /// blocked.
    pub fn set_blocked(&self, blocked: bool) {
        self.model_updated.set_blocked(blocked);
        self.expanded_changed.set_blocked(blocked);
        self.row_data_changed.set_blocked(blocked);
        self.filter_changed.set_blocked(blocked);
        self.sort_changed.set_blocked(blocked);
        self.pivot_columns_changed.set_blocked(blocked);
        self.selection_changed.set_blocked(blocked);
    }

    /// Runs `f` with data and display signals blocked.
    pub fn with_blocked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.set_blocked(true);
        let result = f();
        self.set_blocked(false);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::context::TransactionOp;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_blocked_signals_skip_but_warnings_pass() {
        let signals = RowModelSignals::new();
        let updates = Arc::new(Mutex::new(0));
        let warnings = Arc::new(Mutex::new(0));

        let updates_clone = updates.clone();
        signals.row_data_changed.connect(move |_| *updates_clone.lock() += 1);
        let warnings_clone = warnings.clone();
        signals.warning.connect(move |_| *warnings_clone.lock() += 1);

        signals.with_blocked(|| {
            signals.row_data_changed.emit(());
            signals.warning.emit(GridWarning::MissingRow {
                op: TransactionOp::Remove,
                id: "x".into(),
            });
        });
        signals.row_data_changed.emit(());

        assert_eq!(*updates.lock(), 1);
        assert_eq!(*warnings.lock(), 1);
    }
}
