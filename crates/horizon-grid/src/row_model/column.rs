//! Column definitions as seen by the row model.
//!
//! The row model only needs to know how to read a value out of a record,
//! how to compare two values and how to aggregate them. Everything visual
//! about a column lives elsewhere.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::aggregation::AggFunc;
use super::value::{CellValue, Record};

/// Reads a column value out of a record.
pub type ValueGetter = Arc<dyn Fn(&Record) -> CellValue + Send + Sync>;

/// Compares two column values.
pub type ValueComparator = Arc<dyn Fn(&CellValue, &CellValue) -> Ordering + Send + Sync>;

/// Column id of the auto-generated group column. Sorting by it orders group
/// rows by their key.
pub const AUTO_GROUP_COLUMN: &str = "ag-Grid-AutoColumn";

/// A column definition.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{AggFunc, ColumnDef, Record};
///
/// let column = ColumnDef::new("total")
///     .with_value_getter(|record| {
///         let price = record.value("price").as_f64().unwrap_or(0.0);
///         let qty = record.value("qty").as_f64().unwrap_or(0.0);
///         (price * qty).into()
///     })
///     .with_agg_func(AggFunc::Sum);
///
/// let record = Record::new().with("price", 2.5).with("qty", 4);
/// assert_eq!(column.value(&record).as_f64(), Some(10.0));
/// ```
#[derive(Clone)]
pub struct ColumnDef {
    col_id: String,
    field: String,
    value_getter: Option<ValueGetter>,
    comparator: Option<ValueComparator>,
    agg_func: Option<AggFunc>,
    quick_filter: bool,
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("col_id", &self.col_id)
            .field("field", &self.field)
            .field("value_getter", &self.value_getter.is_some())
            .field("comparator", &self.comparator.is_some())
            .field("agg_func", &self.agg_func)
            .finish()
    }
}

impl ColumnDef {
    /// Creates a column reading the record field of the same name.
    pub fn new(col_id: impl Into<String>) -> Self {
        let col_id = col_id.into();
        Self {
            field: col_id.clone(),
            col_id,
            value_getter: None,
            comparator: None,
            agg_func: None,
            quick_filter: true,
        }
    }

    /// Reads values from a differently named field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Derives values with a getter instead of a field lookup.
    pub fn with_value_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&Record) -> CellValue + Send + Sync + 'static,
    {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    /// Replaces the default comparator.
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&CellValue, &CellValue) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    /// Aggregates this column on group rows.
    pub fn with_agg_func(mut self, agg_func: AggFunc) -> Self {
        self.agg_func = Some(agg_func);
        self
    }

    /// Excludes this column from the quick filter text.
    pub fn without_quick_filter(mut self) -> Self {
        self.quick_filter = false;
        self
    }

    /// Column id.
    pub fn col_id(&self) -> &str {
        &self.col_id
    }

    /// Record field read by default.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Configured aggregation, if any.
    pub fn agg_func(&self) -> Option<&AggFunc> {
        self.agg_func.as_ref()
    }

    pub(crate) fn set_agg_func(&mut self, agg_func: Option<AggFunc>) {
        self.agg_func = agg_func;
    }

    /// Custom comparator, if any.
    pub fn comparator(&self) -> Option<&ValueComparator> {
        self.comparator.as_ref()
    }

    /// Whether the column contributes to the quick filter text.
    pub fn in_quick_filter(&self) -> bool {
        self.quick_filter
    }

    /// Reads this column's value from `record`.
    pub fn value(&self, record: &Record) -> CellValue {
        match &self.value_getter {
            Some(getter) => getter(record),
            None => record.value(&self.field).clone(),
        }
    }
}

/// The set of columns known to a row model, in definition order.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDef>,
    by_id: HashMap<String, usize>,
}

impl ColumnRegistry {
    /// Creates a registry from column definitions. A later definition with
    /// the same id replaces an earlier one.
    pub fn new(columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        let mut registry = Self::default();
        for column in columns {
            registry.insert(column);
        }
        registry
    }

    /// Adds or replaces a column.
    pub fn insert(&mut self, column: ColumnDef) {
        match self.by_id.get(column.col_id()) {
            Some(&index) => self.columns[index] = column,
            None => {
                self.by_id
                    .insert(column.col_id().to_string(), self.columns.len());
                self.columns.push(column);
            }
        }
    }

    /// Looks up a column by id.
    pub fn get(&self, col_id: &str) -> Option<&ColumnDef> {
        self.by_id.get(col_id).map(|&i| &self.columns[i])
    }

    pub(crate) fn get_mut(&mut self, col_id: &str) -> Option<&mut ColumnDef> {
        self.by_id.get(col_id).map(|&i| &mut self.columns[i])
    }

    /// Iterates over columns in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if no columns are defined.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that carry an aggregation function.
    pub fn value_columns(&self) -> impl Iterator<Item = (&ColumnDef, &AggFunc)> {
        self.columns
            .iter()
            .filter_map(|c| c.agg_func().map(|f| (c, f)))
    }

    /// Reads a value for `col_id`. Unknown columns read the field of the
    /// same name.
    pub fn value_of(&self, col_id: &str, record: &Record) -> CellValue {
        match self.get(col_id) {
            Some(column) => column.value(record),
            None => record.value(col_id).clone(),
        }
    }
}
