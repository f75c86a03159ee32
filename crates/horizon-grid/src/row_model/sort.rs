//! Multi-column sorting of sibling rows.
//!
//! Each group's filtered children are ordered by the sort descriptors in
//! `sort_index` order. Equal rows fall through to the next descriptor, and
//! rows equal on every descriptor keep their builder order.

use std::cmp::Ordering;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::{GridError, PerfSpan, Result};
use serde::{Deserialize, Serialize};

use super::aggregation::AggFunc;
use super::changed_path::ChangedPath;
use super::column::{AUTO_GROUP_COLUMN, ValueComparator};
use super::context::{GridContext, GridWarning};
use super::node::{NodeKind, NodeStore, RowKey, RowNode};
use super::pivot::PivotResult;
use super::value::CellValue;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// One sorted column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDescriptor {
    /// Column id.
    pub col_id: String,
    /// Direction.
    pub direction: SortDirection,
    /// Position among the sorted columns.
    #[serde(default)]
    pub sort_index: usize,
}

impl SortDescriptor {
    /// Ascending sort on a column.
    pub fn asc(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            direction: SortDirection::Asc,
            sort_index: 0,
        }
    }

    /// Descending sort on a column.
    pub fn desc(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            direction: SortDirection::Desc,
            sort_index: 0,
        }
    }
}

/// The active sort descriptors.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{SortDescriptor, SortModel};
///
/// let model = SortModel::new()
///     .with(SortDescriptor::desc("gold"))
///     .with(SortDescriptor::asc("country"));
/// assert_eq!(model.descriptors()[1].sort_index, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortModel {
    descriptors: Vec<SortDescriptor>,
}

impl SortModel {
    /// Creates an empty sort model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor after the existing ones.
    pub fn with(mut self, mut descriptor: SortDescriptor) -> Self {
        descriptor.sort_index = self.descriptors.len();
        self.descriptors.push(descriptor);
        self
    }

    /// Builds a model from descriptors carrying their own `sort_index`.
    pub fn from_descriptors(mut descriptors: Vec<SortDescriptor>) -> Self {
        descriptors.sort_by_key(|d| d.sort_index);
        Self { descriptors }
    }

    /// Descriptors in `sort_index` order.
    pub fn descriptors(&self) -> &[SortDescriptor] {
        &self.descriptors
    }

    /// Returns `true` when nothing is sorted.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Parses a sort model from a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptors: Vec<SortDescriptor> =
            serde_json::from_str(json).map_err(GridError::InvalidSettings)?;
        Ok(Self::from_descriptors(descriptors))
    }

    /// Whether sorting reads aggregated group values, which puts
    /// aggregation ahead of sorting.
    pub fn reads_aggregates(&self, ctx: &GridContext, pivot: Option<&PivotResult>) -> bool {
        if !ctx.options.is_grouping() {
            return false;
        }
        self.descriptors.iter().any(|d| {
            ctx.columns
                .get(&d.col_id)
                .is_some_and(|c| c.agg_func().is_some())
                || pivot.is_some_and(|p| p.columns().iter().any(|c| c.col_id == d.col_id))
        })
    }

    /// Reports descriptors that cannot sort anything.
    ///
    /// With registered columns, a column id that is neither registered nor
    /// a group column sorts as a no-op. A column whose named aggregation is
    /// not registered cannot order group rows.
    pub fn validate(&self, ctx: &GridContext) -> Vec<GridWarning> {
        let mut warnings = Vec::new();
        for descriptor in &self.descriptors {
            let col_id = descriptor.col_id.as_str();
            match ctx.columns.get(col_id) {
                Some(column) => {
                    if let Some(AggFunc::Named(name)) = column.agg_func() {
                        if ctx.agg_func(name).is_none() {
                            warnings.push(GridWarning::UnknownAggFunc {
                                col_id: col_id.to_string(),
                                name: name.clone(),
                            });
                        }
                    }
                }
                None => {
                    let known = ctx.columns.is_empty()
                        || col_id == AUTO_GROUP_COLUMN
                        || col_id.starts_with("pivot_")
                        || ctx.options.group_columns().iter().any(|g| g == col_id);
                    if !known {
                        warnings.push(GridWarning::UnknownSortColumn {
                            col_id: col_id.to_string(),
                        });
                    }
                }
            }
        }
        warnings
    }
}

/// Compares two values, placing nulls first or last.
pub fn compare_values(a: &CellValue, b: &CellValue, nulls_first: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(b),
    }
}

struct ResolvedSort<'a> {
    col_id: &'a str,
    descending: bool,
    comparator: Option<&'a ValueComparator>,
    usable: bool,
}

/// Sorts every group's filtered children.
pub struct SortStage<'a> {
    ctx: &'a GridContext,
    model: &'a SortModel,
}

impl<'a> SortStage<'a> {
    /// Creates the stage.
    pub fn new(ctx: &'a GridContext, model: &'a SortModel) -> Self {
        Self { ctx, model }
    }

    /// Recomputes `children_after_sort` for the groups on `path`.
    pub fn execute(&self, store: &mut NodeStore, path: &ChangedPath) {
        let _perf = PerfSpan::new(span_names::SORT);
        let resolved = self.resolve();
        let root = store.root();
        let mut sorted_groups = 0;
        self.sort_node(store, root, path, &resolved, &mut sorted_groups);
        tracing::debug!(
            target: targets::SORT,
            columns = resolved.len(),
            groups = sorted_groups,
            incremental = path.is_active(),
            "sort stage complete"
        );
    }

    fn resolve(&self) -> Vec<ResolvedSort<'_>> {
        self.model
            .descriptors()
            .iter()
            .map(|d| {
                let column = self.ctx.columns.get(&d.col_id);
                ResolvedSort {
                    col_id: d.col_id.as_str(),
                    descending: d.direction == SortDirection::Desc,
                    comparator: column.and_then(|c| c.comparator()),
                    usable: column.is_some()
                        || self.ctx.columns.is_empty()
                        || d.col_id == AUTO_GROUP_COLUMN
                        || d.col_id.starts_with("pivot_")
                        || self.ctx.options.group_columns().contains(&d.col_id),
                }
            })
            .collect()
    }

    fn sort_node(
        &self,
        store: &mut NodeStore,
        key: RowKey,
        path: &ChangedPath,
        resolved: &[ResolvedSort<'_>],
        sorted_groups: &mut usize,
    ) {
        if !path.contains(key) {
            return;
        }
        let Some(node) = store.get(key) else {
            return;
        };
        let children = node.children_after_filter().to_vec();

        let sorted = if resolved.is_empty() {
            children.clone()
        } else {
            let mut keyed: Vec<(RowKey, Vec<CellValue>)> = children
                .iter()
                .filter_map(|&k| store.get(k))
                .map(|child| {
                    let values = resolved.iter().map(|r| self.sort_value(child, r)).collect();
                    (child.key(), values)
                })
                .collect();
            keyed.sort_by(|(_, a), (_, b)| self.compare(resolved, a, b));
            keyed.into_iter().map(|(k, _)| k).collect()
        };

        if let Some(node) = store.get_mut(key) {
            node.children_after_sort = sorted;
        }
        *sorted_groups += 1;

        for child in children {
            let is_parent = store
                .get(child)
                .is_some_and(|c| !c.children_after_group().is_empty());
            if is_parent {
                self.sort_node(store, child, path, resolved, sorted_groups);
            }
        }
    }

    fn compare(&self, resolved: &[ResolvedSort<'_>], a: &[CellValue], b: &[CellValue]) -> Ordering {
        let nulls_first = self.ctx.options.settings.nulls_first;
        for (sort, (x, y)) in resolved.iter().zip(a.iter().zip(b.iter())) {
            let ordering = match sort.comparator {
                Some(comparator) => comparator(x, y),
                None => compare_values(x, y, nulls_first),
            };
            let ordering = if sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn sort_value(&self, node: &RowNode, sort: &ResolvedSort<'_>) -> CellValue {
        if !sort.usable {
            return CellValue::Null;
        }
        let col_id = sort.col_id;
        match node.kind() {
            NodeKind::Group | NodeKind::Filler => {
                if col_id == AUTO_GROUP_COLUMN || node.group_column() == Some(col_id) {
                    return node.group_key().cloned().unwrap_or_default();
                }
                node.agg_data()
                    .map_or(CellValue::Null, |agg| agg.value(col_id))
            }
            NodeKind::Leaf => {
                if col_id == AUTO_GROUP_COLUMN {
                    return node.group_key().cloned().unwrap_or_default();
                }
                node.data()
                    .map_or(CellValue::Null, |data| self.ctx.columns.value_of(col_id, data))
            }
            NodeKind::Root | NodeKind::Footer => CellValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::column::{ColumnDef, ColumnRegistry};
    use crate::row_model::filter::{FilterStage, FilterState};
    use crate::row_model::grouping::GroupStage;
    use crate::row_model::options::GridOptions;
    use crate::row_model::value::Record;

    fn sorted_ids(ctx: &GridContext, model: &SortModel, values: &[(&str, CellValue)]) -> Vec<String> {
        let mut store = NodeStore::new();
        let rows = values
            .iter()
            .map(|(id, v)| (id.to_string(), Record::new().with("v", v.clone())))
            .collect();
        GroupStage::new(ctx).build(&mut store, rows);
        let path = ChangedPath::everything();
        FilterStage::new(ctx, &FilterState::default()).execute(&mut store, &path);
        SortStage::new(ctx, model).execute(&mut store, &path);
        store
            .get(store.root())
            .unwrap()
            .children_after_sort()
            .iter()
            .map(|&k| store.get(k).unwrap().id().to_string())
            .collect()
    }

    #[test]
    fn test_nulls_first_then_reversed_for_desc() {
        let ctx = GridContext::new(GridOptions::new(), ColumnRegistry::default());
        let values = [
            ("a", CellValue::from(2)),
            ("b", CellValue::Null),
            ("c", CellValue::from(1)),
        ];
        let asc = SortModel::new().with(SortDescriptor::asc("v"));
        assert_eq!(sorted_ids(&ctx, &asc, &values), vec!["b", "c", "a"]);
        let desc = SortModel::new().with(SortDescriptor::desc("v"));
        assert_eq!(sorted_ids(&ctx, &desc, &values), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_stable_ties_keep_builder_order() {
        let ctx = GridContext::new(GridOptions::new(), ColumnRegistry::default());
        let values = [
            ("a", CellValue::from(1)),
            ("b", CellValue::from(0)),
            ("c", CellValue::from(1)),
            ("d", CellValue::from(0)),
        ];
        let model = SortModel::new().with(SortDescriptor::asc("v"));
        assert_eq!(sorted_ids(&ctx, &model, &values), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_custom_comparator() {
        let columns = ColumnRegistry::new([ColumnDef::new("v").with_comparator(|a, b| {
            let len = |v: &CellValue| v.to_key_string().len();
            len(a).cmp(&len(b))
        })]);
        let ctx = GridContext::new(GridOptions::new(), columns);
        let values = [
            ("a", CellValue::from("ccc")),
            ("b", CellValue::from("a")),
            ("c", CellValue::from("bb")),
        ];
        let model = SortModel::new().with(SortDescriptor::asc("v"));
        assert_eq!(sorted_ids(&ctx, &model, &values), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_unknown_column_is_noop() {
        let ctx = GridContext::new(GridOptions::new(), ColumnRegistry::new([ColumnDef::new("v")]));
        let values = [("a", CellValue::from(2)), ("b", CellValue::from(1))];
        let model = SortModel::new().with(SortDescriptor::asc("nope"));
        assert_eq!(sorted_ids(&ctx, &model, &values), vec!["a", "b"]);
        assert_eq!(
            model.validate(&ctx),
            vec![GridWarning::UnknownSortColumn {
                col_id: "nope".into()
            }]
        );
    }

    #[test]
    fn test_sort_model_json() {
        let model = SortModel::from_json(
            r#"[{"colId": "b", "direction": "asc", "sortIndex": 1},
                {"colId": "a", "direction": "desc", "sortIndex": 0}]"#,
        )
        .unwrap();
        assert_eq!(model.descriptors()[0].col_id, "a");
        assert_eq!(model.descriptors()[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_compare_values_nulls_last() {
        assert_eq!(
            compare_values(&CellValue::Null, &CellValue::from(1), false),
            Ordering::Greater
        );
    }
}
