//! Shared plumbing for the Horizon Grid row models.
//!
//! - [`Signal`]: typed change notifications, one signal per kind of change
//! - [`GridError`]: the error type returned by row model operations
//! - [`logging`]: `tracing` targets, stage spans and tree dump options
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! let displayed_count = Signal::<usize>::new();
//! let id = displayed_count.connect(|count| println!("{count} rows on screen"));
//!
//! displayed_count.emit(42);
//! displayed_count.disconnect(id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{GridError, Result};
pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
