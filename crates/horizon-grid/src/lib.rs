//! Horizon Grid - a client-side row model for data grids.
//!
//! The row model turns a flat list of records into the sequence of rows a
//! virtualized grid view renders: records are grouped (by column values or
//! by a tree-data path), filtered, optionally pivoted, sorted, aggregated and
//! finally flattened into contiguous display indices with pixel offsets.
//!
//! # Example
//!
//! ```
//! use horizon_grid::prelude::*;
//!
//! let mut model = ClientSideRowModel::new(
//!     GridOptions::new()
//!         .with_group_columns(["g"])
//!         .with_row_id(|r| r.value("id").to_key_string()),
//!     [ColumnDef::new("v").with_agg_func(AggFunc::Sum)],
//! )?;
//!
//! model.set_row_data(vec![
//!     Record::new().with("id", 1).with("g", "A").with("v", 10),
//!     Record::new().with("id", 2).with("g", "B").with("v", 5),
//! ])?;
//!
//! // React to display changes
//! model.signals().model_updated.connect(|update| {
//!     println!("{} rows displayed", update.displayed_row_count);
//! });
//!
//! let result = model.apply_transaction(
//!     Transaction::new().with_add(Record::new().with("id", 3).with("g", "A").with("v", 1)),
//! );
//! assert_eq!(result.add, vec!["3".to_string()]);
//!
//! let group = model.get_row_node("row-group-g-A").unwrap();
//! assert_eq!(group.agg_data().unwrap().value("v"), CellValue::Float(11.0));
//! # Ok::<(), horizon_grid::GridError>(())
//! ```

pub mod prelude;
pub mod row_model;

pub use horizon_grid_core::{GridError, Result, Signal, logging};

pub(crate) use horizon_grid_core::{grid_debug, grid_info, grid_trace, grid_warn};
