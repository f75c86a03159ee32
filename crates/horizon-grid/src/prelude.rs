//! Prelude module for Horizon Grid.
//!
//! ```ignore
//! use horizon_grid::prelude::*;
//! ```

// ============================================================================
// Row model
// ============================================================================

pub use crate::row_model::{
    ClientSideRowModel, GridOptions, GridSettings, RefreshStep, RowModel, RowNode,
};

// ============================================================================
// Records and columns
// ============================================================================

pub use crate::row_model::{AggFunc, CellValue, ColumnDef, Record};

// ============================================================================
// Filter, sort, transactions
// ============================================================================

pub use crate::row_model::{
    ColumnFilter, FilterCondition, FilterModel, FilterOperator, SortDescriptor, SortModel,
    Transaction,
};

// ============================================================================
// Core
// ============================================================================

pub use horizon_grid_core::{GridError, Signal};
