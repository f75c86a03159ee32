//! Pivot result columns.
//!
//! In pivot mode the distinct value tuples of the pivot columns across the
//! filtered leaves become result columns, one per tuple and value column.
//! Aggregation then fills one value per result column on every group.

use std::collections::HashSet;

use horizon_grid_core::PerfSpan;
use horizon_grid_core::logging::span_names;

use super::context::GridContext;
use super::node::{NodeKind, NodeStore};
use super::value::CellValue;

/// A generated pivot result column.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotColumn {
    /// Result column id, `pivot_<key1>_<key2>_<valueColumn>`.
    pub col_id: String,
    /// Pivot values this column aggregates.
    pub pivot_keys: Vec<CellValue>,
    /// The aggregated value column.
    pub value_column: String,
}

/// The output of the pivot stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotResult {
    keys: Vec<Vec<CellValue>>,
    columns: Vec<PivotColumn>,
}

impl PivotResult {
    /// Distinct pivot key tuples, sorted.
    pub fn keys(&self) -> &[Vec<CellValue>] {
        &self.keys
    }

    /// Result columns, grouped by key tuple.
    pub fn columns(&self) -> &[PivotColumn] {
        &self.columns
    }

    /// Result column ids.
    pub fn column_ids(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.col_id.clone()).collect()
    }
}

/// Collects pivot keys.
pub struct PivotStage<'a> {
    ctx: &'a GridContext,
}

impl<'a> PivotStage<'a> {
    /// Creates the stage.
    pub fn new(ctx: &'a GridContext) -> Self {
        Self { ctx }
    }

    /// Computes the pivot result, `None` outside pivot mode.
    pub fn execute(&self, store: &NodeStore) -> Option<PivotResult> {
        if !self.ctx.options.is_pivot_active() {
            return None;
        }
        let _perf = PerfSpan::new(span_names::PIVOT);
        let pivot_columns = self.ctx.options.pivot_columns();

        let mut seen = HashSet::new();
        let mut keys: Vec<Vec<CellValue>> = Vec::new();
        let mut stack = vec![store.root()];
        while let Some(key) = stack.pop() {
            let Some(node) = store.get(key) else {
                continue;
            };
            if node.kind() == NodeKind::Leaf && node.children_after_group().is_empty() {
                if let Some(data) = node.data() {
                    let tuple: Vec<CellValue> = pivot_columns
                        .iter()
                        .map(|col| self.ctx.columns.value_of(col, data))
                        .collect();
                    let strings: Vec<String> = tuple.iter().map(CellValue::to_key_string).collect();
                    if seen.insert(strings) {
                        keys.push(tuple);
                    }
                }
                continue;
            }
            stack.extend(node.children_after_filter().iter().rev());
        }

        keys.sort_by(|a, b| {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let value_columns: Vec<String> = self
            .ctx
            .columns
            .value_columns()
            .map(|(c, _)| c.col_id().to_string())
            .collect();
        let columns = keys
            .iter()
            .flat_map(|tuple| {
                let prefix: Vec<String> = tuple.iter().map(CellValue::to_key_string).collect();
                let prefix = prefix.join("_");
                value_columns.iter().map(move |value_column| PivotColumn {
                    col_id: format!("pivot_{prefix}_{value_column}"),
                    pivot_keys: tuple.clone(),
                    value_column: value_column.clone(),
                })
            })
            .collect();

        Some(PivotResult { keys, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::aggregation::AggFunc;
    use crate::row_model::changed_path::ChangedPath;
    use crate::row_model::column::{ColumnDef, ColumnRegistry};
    use crate::row_model::filter::{FilterStage, FilterState};
    use crate::row_model::grouping::GroupStage;
    use crate::row_model::options::GridOptions;
    use crate::row_model::value::Record;

    #[test]
    fn test_pivot_columns_sorted_and_distinct() {
        let mut options = GridOptions::new()
            .with_group_columns(["country"])
            .with_pivot_columns(["year"]);
        options.settings.pivot_mode = true;
        let ctx = GridContext::new(
            options,
            ColumnRegistry::new([ColumnDef::new("gold").with_agg_func(AggFunc::Sum)]),
        );
        let mut store = NodeStore::new();
        let rows = [("US", 2012), ("US", 2008), ("FR", 2012)]
            .iter()
            .enumerate()
            .map(|(i, (country, year))| {
                (
                    i.to_string(),
                    Record::new()
                        .with("country", *country)
                        .with("year", *year)
                        .with("gold", 1),
                )
            })
            .collect();
        GroupStage::new(&ctx).build(&mut store, rows);
        FilterStage::new(&ctx, &FilterState::default()).execute(&mut store, &ChangedPath::everything());

        let result = PivotStage::new(&ctx).execute(&store).unwrap();
        assert_eq!(
            result.keys(),
            &[vec![CellValue::Int(2008)], vec![CellValue::Int(2012)]]
        );
        assert_eq!(
            result.column_ids(),
            vec!["pivot_2008_gold".to_string(), "pivot_2012_gold".to_string()]
        );
    }

    #[test]
    fn test_inactive_without_pivot_mode() {
        let ctx = GridContext::new(
            GridOptions::new().with_pivot_columns(["year"]),
            ColumnRegistry::default(),
        );
        assert!(PivotStage::new(&ctx).execute(&NodeStore::new()).is_none());
    }
}
