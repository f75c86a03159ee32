//! Client-side row model.
//!
//! This module holds every record in memory and derives the displayed rows
//! from them. The work is split into pipeline stages that each own one
//! concern and run in a fixed dependency order:
//!
//! - **Group** (`GroupStage`): builds the row tree from records, by group
//!   columns or by a tree-data path
//! - **Filter** (`FilterStage`): column filters, quick filter and external
//!   filter; groups stay visible while any descendant passes
//! - **Pivot** (`PivotStage`): collects pivot keys into result columns
//! - **Sort** (`SortStage`): multi-column, stable, per sibling list
//! - **Aggregate** (`AggregationStage`): bottom-up, composable reducers
//! - **Flatten** (`FlattenStage`): display indices and pixel offsets
//!
//! # Core Types
//!
//! - `ClientSideRowModel`: the coordinator and public API
//! - `RowNode` / `NodeStore`: arena-allocated row tree
//! - `GridContext`: configuration, columns and signals shared by the stages
//! - `Transaction` / `RowNodeTransaction`: incremental updates and their
//!   net effect
//! - `RowModelSignals`: typed change notifications
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐   records    ┌───────────────────┐   signals   ┌──────────┐
//! │    Caller    │─────────────>│ ClientSideRowModel│────────────>│   View   │
//! │ (API, edits) │ transactions │  (pipeline owner) │             │          │
//! └──────────────┘              └───────────────────┘             └──────────┘
//!                                        │                              │
//!                                        ▼                              │
//!                               ┌─────────────────┐  displayed_row_at_index
//!                               │    NodeStore    │<─────────────────────┘
//!                               │  (row arena)    │
//!                               └─────────────────┘
//! ```

mod aggregation;
mod changed_path;
mod client_side;
mod column;
mod context;
mod debug;
mod filter;
mod flatten;
mod grouping;
mod node;
mod options;
mod pivot;
mod signals;
mod sort;
mod steps;
mod traits;
mod transaction;
mod traversal;
mod value;

pub use aggregation::{AggData, AggFunc, AggValue, AggregationStage, CustomAggFn};
pub use changed_path::ChangedPath;
pub use client_side::ClientSideRowModel;
pub use column::{AUTO_GROUP_COLUMN, ColumnDef, ColumnRegistry, ValueComparator, ValueGetter};
pub use context::{GridContext, GridWarning, TransactionOp};
pub use debug::RowTreeDebug;
pub use filter::{
    ColumnFilter, FilterCondition, FilterModel, FilterOperator, FilterStage, FilterState,
    QuickFilter,
};
pub use flatten::{DisplayList, FlattenStage, RowBounds};
pub use grouping::{FILLER_ID_PREFIX, GROUP_ID_PREFIX, GroupStage, tree_path};
pub use node::{Ancestors, ChildView, NodeKind, NodeStore, ROOT_NODE_ID, RowKey, RowNode};
pub use options::{
    DataPathFn, ExternalFilterFn, FilterJoin, GridOptions, GridSettings, MissingUpdatePolicy,
    NullGroupPolicy, RowHeightFn, RowIdFn,
};
pub use pivot::{PivotColumn, PivotResult, PivotStage};
pub use signals::{ModelUpdate, RowModelSignals};
pub use sort::{SortDescriptor, SortDirection, SortModel, SortStage, compare_values};
pub use steps::{PipelinePlan, RefreshStep, Stage};
pub use traits::RowModel;
pub use transaction::{
    RemovedRow, RowNodeTransaction, Transaction, TransactionProcessor, TransactionQueue,
};
pub use traversal::NodeIter;
pub use value::{CellValue, Record};
