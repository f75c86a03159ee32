//! The explicit context shared by all pipeline stages.
//!
//! Stages receive a `&GridContext` when they are constructed instead of
//! reaching for global registries. The context owns the configuration, the
//! column definitions, the named aggregation functions and the signals.

use std::collections::HashMap;
use std::fmt;

use super::aggregation::CustomAggFn;
use super::column::ColumnRegistry;
use super::options::GridOptions;
use super::signals::RowModelSignals;

/// The transaction part an item belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOp {
    /// `add` item.
    Add,
    /// `remove` item.
    Remove,
    /// `update` item.
    Update,
}

impl fmt::Display for TransactionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionOp::Add => write!(f, "add"),
            TransactionOp::Remove => write!(f, "remove"),
            TransactionOp::Update => write!(f, "update"),
        }
    }
}

/// A non-fatal problem reported on the warning channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridWarning {
    /// A remove or update referenced a row that does not exist.
    #[error("{op} ignored: no row with id '{id}'")]
    MissingRow { op: TransactionOp, id: String },

    /// An add reused an id already present in the tree.
    #[error("add ignored: row id '{id}' already exists")]
    DuplicateRow { id: String },

    /// An add used an id from the generated group, filler or footer namespace.
    #[error("add ignored: row id '{id}' is reserved for generated rows")]
    ReservedRowId { id: String },

    /// Two tree-data records resolved to the same path.
    #[error("duplicate tree data path {path:?} for row '{id}'")]
    DuplicatePath { id: String, path: Vec<String> },

    /// A tree-data record produced an empty path.
    #[error("row '{id}' has an empty tree data path and was skipped")]
    EmptyPath { id: String },

    /// A queued transaction was discarded because the data was replaced.
    #[error("transaction queued at generation {queued} discarded, data is at generation {current}")]
    StaleTransaction { queued: u64, current: u64 },

    /// The sort model references a column that cannot be sorted.
    #[error("sort column '{col_id}' is unknown, rows keep their order")]
    UnknownSortColumn { col_id: String },

    /// A column names an aggregation function that is not registered.
    #[error("column '{col_id}' uses unknown aggregation function '{name}'")]
    UnknownAggFunc { col_id: String, name: String },
}

/// Service locator passed to every pipeline stage.
pub struct GridContext {
    pub(crate) options: GridOptions,
    pub(crate) columns: ColumnRegistry,
    pub(crate) agg_funcs: HashMap<String, CustomAggFn>,
    pub(crate) signals: RowModelSignals,
}

impl fmt::Debug for GridContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridContext")
            .field("options", &self.options)
            .field("columns", &self.columns)
            .field("agg_funcs", &self.agg_funcs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GridContext {
    /// Creates a context.
    pub fn new(options: GridOptions, columns: ColumnRegistry) -> Self {
        Self {
            options,
            columns,
            agg_funcs: HashMap::new(),
            signals: RowModelSignals::new(),
        }
    }

    /// Configuration.
    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Column definitions.
    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    /// Signals.
    pub fn signals(&self) -> &RowModelSignals {
        &self.signals
    }

    /// Looks up a named aggregation function.
    pub fn agg_func(&self, name: &str) -> Option<&CustomAggFn> {
        self.agg_funcs.get(name)
    }

    /// Logs a warning and emits it on the warning channel.
    pub fn warn(&self, warning: GridWarning) {
        crate::grid_warn!(%warning, "row model warning");
        self.signals.warning.emit(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_warning_messages() {
        let warning = GridWarning::MissingRow {
            op: TransactionOp::Update,
            id: "42".into(),
        };
        assert_eq!(warning.to_string(), "update ignored: no row with id '42'");

        let warning = GridWarning::StaleTransaction {
            queued: 1,
            current: 2,
        };
        assert!(warning.to_string().contains("generation 1"));
    }

    #[test]
    fn test_warn_emits_signal() {
        let ctx = GridContext::new(GridOptions::new(), ColumnRegistry::default());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        ctx.signals()
            .warning
            .connect(move |w| received_clone.lock().push(w.clone()));

        ctx.warn(GridWarning::DuplicateRow { id: "a".into() });

        assert_eq!(
            *received.lock(),
            vec![GridWarning::DuplicateRow { id: "a".into() }]
        );
    }
}
