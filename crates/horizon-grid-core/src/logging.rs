//! Tracing targets, pipeline spans and tree dump options.
//!
//! Everything the row model logs goes through `tracing`. Each subsystem has
//! its own target (see [`targets`]), so one noisy stage can be turned up
//! without flooding the rest:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_grid::transaction=debug,horizon_grid::perf=debug")
//!     .init();
//! ```
//!
//! Pipeline stages hold a [`PerfSpan`] while they run; with the `perf` target
//! enabled, every stage reports its duration when it finishes.

use std::time::Instant;

/// Names of the spans opened around each pipeline stage.
pub mod span_names {
    pub const PIPELINE: &str = "horizon_grid::pipeline";
    pub const GROUP: &str = "horizon_grid::group";
    pub const FILTER: &str = "horizon_grid::filter";
    pub const PIVOT: &str = "horizon_grid::pivot";
    pub const AGGREGATE: &str = "horizon_grid::aggregate";
    pub const SORT: &str = "horizon_grid::sort";
    /// Display index and pixel offset assignment.
    pub const FLATTEN: &str = "horizon_grid::flatten";
}

/// `tracing` targets, one per subsystem.
pub mod targets {
    pub const ROW_MODEL: &str = "horizon_grid::row_model";
    pub const TRANSACTION: &str = "horizon_grid::transaction";
    pub const FILTER: &str = "horizon_grid::filter";
    pub const SORT: &str = "horizon_grid::sort";
    pub const AGGREGATION: &str = "horizon_grid::aggregation";
    pub const FLATTEN: &str = "horizon_grid::flatten";
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Stage timings reported by [`PerfSpan`](super::PerfSpan).
    pub const PERF: &str = "horizon_grid::perf";
}

/// Glyphs used to draw branches in a row tree dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `|`, `+--` and `` `-- ``.
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// A single dash per row, no vertical rails.
    Compact,
}

impl TreeStyle {
    /// Returns `(rail, branch, last_branch)`.
    fn glyphs(self) -> (&'static str, &'static str, &'static str) {
        match self {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        }
    }
}

/// What a row tree dump shows.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Print each row's id after its label.
    pub show_ids: bool,
    /// Print the display index (`#3`) of rows that have one.
    pub show_row_index: bool,
    /// Print aggregated values next to group rows.
    pub show_aggregates: bool,
    /// Walk the unfiltered children and mark rows the filter removed.
    pub include_filtered: bool,
    /// Rows deeper than this are left out. `None` prints the whole tree.
    pub max_depth: Option<usize>,
    /// Spaces after each rail.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::Unicode,
            show_ids: true,
            show_row_index: true,
            show_aggregates: false,
            include_filtered: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything on, including rows hidden by the filter.
    pub fn detailed() -> Self {
        Self {
            show_aggregates: true,
            include_filtered: true,
            ..Self::default()
        }
    }

    /// Labels and structure only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_row_index: false,
            ..Self::default()
        }
    }

    /// The branch drawing that precedes a row at `depth`. Top-level rows
    /// (depth 0) get none.
    pub fn line_prefix(&self, depth: usize, is_last: bool) -> String {
        let Some(rails) = depth.checked_sub(1) else {
            return String::new();
        };

        let (rail, branch, last_branch) = self.style.glyphs();
        let segment = format!("{rail}{}", " ".repeat(self.indent_size));
        let tip = if is_last { last_branch } else { branch };
        format!("{}{tip} ", segment.repeat(rails))
    }
}

/// Keeps a stage span entered and reports the stage duration when dropped.
///
/// ```
/// use horizon_grid_core::PerfSpan;
///
/// {
///     let _perf = PerfSpan::new("horizon_grid::sort");
///     // sort...
/// } // duration logged under `horizon_grid::perf`
/// ```
#[derive(Debug)]
pub struct PerfSpan {
    operation: &'static str,
    started: Instant,
    _entered: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_grid::perf", "stage", operation);
        Self {
            operation,
            started: Instant::now(),
            _entered: span.entered(),
        }
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        tracing::debug!(
            target: "horizon_grid::perf",
            operation = self.operation,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "stage finished"
        );
    }
}

/// `tracing` shorthands that log under the row model target.
#[macro_export]
macro_rules! grid_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_grid::row_model", $($arg)*)
    };
}

#[macro_export]
macro_rules! grid_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_grid::row_model", $($arg)*)
    };
}

#[macro_export]
macro_rules! grid_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "horizon_grid::row_model", $($arg)*)
    };
}

#[macro_export]
macro_rules! grid_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_grid::row_model", $($arg)*)
    };
}
