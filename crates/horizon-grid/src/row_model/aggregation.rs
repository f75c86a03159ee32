//! Aggregation of group rows.
//!
//! Aggregates are computed bottom-up from each group's filtered children.
//! A leaf child contributes its lifted column value; a group child
//! contributes its own partial result. Partials are composable: an average
//! carries `(sum, count)` all the way up and is only divided when read.
//!
//! With an active changed path only the groups on the path are recomputed;
//! every other group keeps its cached [`AggData`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::PerfSpan;
use horizon_grid_core::logging::{span_names, targets};

use super::changed_path::ChangedPath;
use super::context::GridContext;
use super::node::{NodeKind, NodeStore, RowKey};
use super::pivot::PivotResult;
use super::value::{CellValue, Record};

/// A user-supplied reducer. Receives the values of a group's children
/// (leaf values or child group results) and returns the group value.
pub type CustomAggFn = Arc<dyn Fn(&[CellValue]) -> CellValue + Send + Sync>;

/// Aggregation function of a value column.
#[derive(Clone)]
pub enum AggFunc {
    /// Sum of numeric values.
    Sum,
    /// Smallest numeric value.
    Min,
    /// Largest numeric value.
    Max,
    /// Number of rows.
    Count,
    /// Mean of numeric values.
    Avg,
    /// First value in group order.
    First,
    /// Last value in group order.
    Last,
    /// User-supplied reducer.
    Custom(CustomAggFn),
    /// Reducer registered on the row model under a name.
    Named(String),
}

impl fmt::Debug for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggFunc::Custom(_) => write!(f, "Custom(..)"),
            AggFunc::Named(name) => write!(f, "Named({name:?})"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl AggFunc {
    /// Wraps a closure as a custom reducer.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[CellValue]) -> CellValue + Send + Sync + 'static,
    {
        AggFunc::Custom(Arc::new(f))
    }

    /// Resolves a function name. Unknown names become [`AggFunc::Named`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "sum" => AggFunc::Sum,
            "min" => AggFunc::Min,
            "max" => AggFunc::Max,
            "count" => AggFunc::Count,
            "avg" => AggFunc::Avg,
            "first" => AggFunc::First,
            "last" => AggFunc::Last,
            other => AggFunc::Named(other.to_string()),
        }
    }

    /// Function name.
    pub fn name(&self) -> &str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
            AggFunc::Avg => "avg",
            AggFunc::First => "first",
            AggFunc::Last => "last",
            AggFunc::Custom(_) => "custom",
            AggFunc::Named(name) => name,
        }
    }
}

/// A composable partial aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum AggValue {
    /// Nothing contributed.
    Empty,
    /// Running sum, minimum or maximum.
    Number(f64),
    /// Running average.
    Average {
        /// Sum of contributing values.
        sum: f64,
        /// Number of contributing values.
        count: u64,
    },
    /// Running count.
    Count(u64),
    /// First, last or custom result.
    Value(CellValue),
}

impl AggValue {
    /// The value shown for this partial.
    pub fn value(&self) -> CellValue {
        match self {
            AggValue::Empty => CellValue::Null,
            AggValue::Number(n) => CellValue::Float(*n),
            AggValue::Average { count: 0, .. } => CellValue::Null,
            AggValue::Average { sum, count } => CellValue::Float(sum / *count as f64),
            AggValue::Count(n) => CellValue::Int(i64::try_from(*n).unwrap_or(i64::MAX)),
            AggValue::Value(v) => v.clone(),
        }
    }
}

/// Aggregated values of a group, keyed by result column id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggData {
    values: BTreeMap<String, AggValue>,
}

impl AggData {
    /// The partial for a column.
    pub fn get(&self, col_id: &str) -> Option<&AggValue> {
        self.values.get(col_id)
    }

    /// The displayed value for a column, `Null` when absent.
    pub fn value(&self, col_id: &str) -> CellValue {
        self.values
            .get(col_id)
            .map_or(CellValue::Null, AggValue::value)
    }

    /// Iterates over `(column id, partial)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of aggregated columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is aggregated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A reducer with named functions already resolved.
#[derive(Clone)]
enum Reducer {
    Sum,
    Min,
    Max,
    Count { include_missing: bool },
    Avg,
    First,
    Last,
    Custom(CustomAggFn),
}

impl Reducer {
    fn lift(&self, value: &CellValue) -> AggValue {
        match self {
            Reducer::Sum | Reducer::Min | Reducer::Max => {
                value.as_f64().map_or(AggValue::Empty, AggValue::Number)
            }
            Reducer::Count { include_missing } => {
                if value.is_null() && !include_missing {
                    AggValue::Count(0)
                } else {
                    AggValue::Count(1)
                }
            }
            Reducer::Avg => match value.as_f64() {
                Some(n) => AggValue::Average { sum: n, count: 1 },
                None => AggValue::Average { sum: 0.0, count: 0 },
            },
            Reducer::First | Reducer::Last | Reducer::Custom(_) => AggValue::Value(value.clone()),
        }
    }

    fn combine(&self, parts: &[AggValue]) -> AggValue {
        let numbers = || {
            parts.iter().filter_map(|p| match p {
                AggValue::Number(n) => Some(*n),
                _ => None,
            })
        };
        match self {
            Reducer::Sum => numbers()
                .reduce(|a, b| a + b)
                .map_or(AggValue::Empty, AggValue::Number),
            Reducer::Min => numbers()
                .reduce(f64::min)
                .map_or(AggValue::Empty, AggValue::Number),
            Reducer::Max => numbers()
                .reduce(f64::max)
                .map_or(AggValue::Empty, AggValue::Number),
            Reducer::Count { .. } => AggValue::Count(
                parts
                    .iter()
                    .map(|p| match p {
                        AggValue::Count(n) => *n,
                        _ => 0,
                    })
                    .sum(),
            ),
            Reducer::Avg => {
                let (sum, count) = parts.iter().fold((0.0, 0), |(s, c), p| match p {
                    AggValue::Average { sum, count } => (s + sum, c + count),
                    _ => (s, c),
                });
                AggValue::Average { sum, count }
            }
            Reducer::First => parts
                .iter()
                .find(|p| !matches!(p, AggValue::Empty))
                .cloned()
                .unwrap_or(AggValue::Empty),
            Reducer::Last => parts
                .iter()
                .rev()
                .find(|p| !matches!(p, AggValue::Empty))
                .cloned()
                .unwrap_or(AggValue::Empty),
            Reducer::Custom(f) => {
                let values: Vec<CellValue> = parts.iter().map(AggValue::value).collect();
                AggValue::Value(f(&values))
            }
        }
    }
}

/// One aggregated output column.
#[derive(Clone)]
struct AggTarget {
    result_id: String,
    value_column: String,
    reducer: Reducer,
    pivot_keys: Option<Vec<String>>,
}

/// Computes group aggregates.
pub struct AggregationStage<'a> {
    ctx: &'a GridContext,
    pivot: Option<&'a PivotResult>,
}

impl<'a> AggregationStage<'a> {
    /// Creates the stage. `pivot` adds one output column per pivot result
    /// column.
    pub fn new(ctx: &'a GridContext, pivot: Option<&'a PivotResult>) -> Self {
        Self { ctx, pivot }
    }

    /// Recomputes aggregates for the groups on `path`, deepest first.
    pub fn execute(&self, store: &mut NodeStore, path: &ChangedPath) {
        let _perf = PerfSpan::new(span_names::AGGREGATE);
        let agg_targets = self.targets();

        let order: Vec<RowKey> = if path.is_active() {
            path.bottom_up(store)
                .into_iter()
                .filter(|&k| store.get(k).is_some_and(|n| n.is_group()))
                .collect()
        } else {
            let mut groups: Vec<(i32, RowKey)> = store
                .iter()
                .filter(|n| n.is_group())
                .map(|n| (n.level(), n.key()))
                .collect();
            groups.sort_by(|a, b| b.0.cmp(&a.0));
            groups.into_iter().map(|(_, k)| k).collect()
        };

        for &key in &order {
            let data = if agg_targets.is_empty() {
                None
            } else {
                Some(self.aggregate_group(store, key, &agg_targets))
            };
            if let Some(node) = store.get_mut(key) {
                node.agg_data = data;
            }
        }

        tracing::debug!(
            target: targets::AGGREGATION,
            groups = order.len(),
            columns = agg_targets.len(),
            incremental = path.is_active(),
            "aggregation complete"
        );
    }

    fn targets(&self) -> Vec<AggTarget> {
        let mut result = Vec::new();
        for (column, func) in self.ctx.columns.value_columns() {
            let Some(reducer) = self.resolve(func) else {
                continue;
            };
            if let Some(pivot) = self.pivot {
                for pivot_column in pivot
                    .columns()
                    .iter()
                    .filter(|p| p.value_column == column.col_id())
                {
                    result.push(AggTarget {
                        result_id: pivot_column.col_id.clone(),
                        value_column: column.col_id().to_string(),
                        reducer: reducer.clone(),
                        pivot_keys: Some(
                            pivot_column
                                .pivot_keys
                                .iter()
                                .map(CellValue::to_key_string)
                                .collect(),
                        ),
                    });
                }
            }
            result.push(AggTarget {
                result_id: column.col_id().to_string(),
                value_column: column.col_id().to_string(),
                reducer,
                pivot_keys: None,
            });
        }
        result
    }

    fn resolve(&self, func: &AggFunc) -> Option<Reducer> {
        Some(match func {
            AggFunc::Sum => Reducer::Sum,
            AggFunc::Min => Reducer::Min,
            AggFunc::Max => Reducer::Max,
            AggFunc::Count => Reducer::Count {
                include_missing: self.ctx.options.settings.count_includes_missing,
            },
            AggFunc::Avg => Reducer::Avg,
            AggFunc::First => Reducer::First,
            AggFunc::Last => Reducer::Last,
            AggFunc::Custom(f) => Reducer::Custom(f.clone()),
            AggFunc::Named(name) => Reducer::Custom(self.ctx.agg_func(name)?.clone()),
        })
    }

    fn aggregate_group(&self, store: &NodeStore, key: RowKey, targets: &[AggTarget]) -> AggData {
        let Some(node) = store.get(key) else {
            return AggData::default();
        };

        let pivot_columns = self.ctx.options.pivot_columns();
        let mut parts: Vec<Vec<AggValue>> = vec![Vec::new(); targets.len()];

        for &child_key in node.children_after_filter() {
            let Some(child) = store.get(child_key) else {
                continue;
            };
            let is_parent = child.kind() != NodeKind::Leaf || !child.children_after_group().is_empty();
            if is_parent {
                let child_data = child.agg_data();
                for (target, bucket) in targets.iter().zip(parts.iter_mut()) {
                    if let Some(value) = child_data.and_then(|d| d.get(&target.result_id)) {
                        bucket.push(value.clone());
                    }
                }
                continue;
            }

            let Some(data) = child.data() else {
                continue;
            };
            let leaf_keys = self.pivot.map(|_| pivot_key_strings(self.ctx, pivot_columns, data));
            for (target, bucket) in targets.iter().zip(parts.iter_mut()) {
                if let (Some(wanted), Some(actual)) = (&target.pivot_keys, &leaf_keys) {
                    if wanted != actual {
                        continue;
                    }
                }
                let value = self.ctx.columns.value_of(&target.value_column, data);
                bucket.push(target.reducer.lift(&value));
            }
        }

        AggData {
            values: targets
                .iter()
                .zip(parts)
                .map(|(target, bucket)| (target.result_id.clone(), target.reducer.combine(&bucket)))
                .collect(),
        }
    }
}

fn pivot_key_strings(ctx: &GridContext, pivot_columns: &[String], data: &Record) -> Vec<String> {
    pivot_columns
        .iter()
        .map(|col| ctx.columns.value_of(col, data).to_key_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combine(reducer: Reducer, values: &[CellValue]) -> CellValue {
        let parts: Vec<AggValue> = values.iter().map(|v| reducer.lift(v)).collect();
        reducer.combine(&parts).value()
    }

    #[test]
    fn test_sum_skips_non_numeric() {
        let values = [CellValue::from(1), CellValue::from("x"), CellValue::Null, CellValue::from(2.5)];
        assert_eq!(combine(Reducer::Sum, &values), CellValue::Float(3.5));
        assert_eq!(combine(Reducer::Sum, &[CellValue::Null]), CellValue::Null);
    }

    #[test]
    fn test_min_max() {
        let values = [CellValue::from(4), CellValue::from(-1), CellValue::from(9)];
        assert_eq!(combine(Reducer::Min, &values), CellValue::Float(-1.0));
        assert_eq!(combine(Reducer::Max, &values), CellValue::Float(9.0));
    }

    #[test]
    fn test_count_missing_policy() {
        let values = [CellValue::from(1), CellValue::Null];
        assert_eq!(
            combine(Reducer::Count { include_missing: true }, &values),
            CellValue::Int(2)
        );
        assert_eq!(
            combine(Reducer::Count { include_missing: false }, &values),
            CellValue::Int(1)
        );
    }

    #[test]
    fn test_average_of_averages_is_weighted() {
        let reducer = Reducer::Avg;
        let left = reducer.combine(&[reducer.lift(&CellValue::from(1))]);
        let right = reducer.combine(&[reducer.lift(&CellValue::from(2)), reducer.lift(&CellValue::from(3))]);
        let top = reducer.combine(&[left, right]);
        assert_eq!(top, AggValue::Average { sum: 6.0, count: 3 });
        assert_eq!(top.value(), CellValue::Float(2.0));
    }

    #[test]
    fn test_first_last() {
        let values = [CellValue::from("a"), CellValue::from("b"), CellValue::from("c")];
        assert_eq!(combine(Reducer::First, &values), CellValue::from("a"));
        assert_eq!(combine(Reducer::Last, &values), CellValue::from("c"));
    }

    #[test]
    fn test_custom_reducer() {
        let distinct = AggFunc::custom(|values| {
            let mut seen: Vec<String> = values.iter().map(CellValue::to_key_string).collect();
            seen.sort();
            seen.dedup();
            CellValue::Int(seen.len() as i64)
        });
        let AggFunc::Custom(f) = distinct else {
            panic!("expected custom");
        };
        let values = [CellValue::from("x"), CellValue::from("y"), CellValue::from("x")];
        assert_eq!(combine(Reducer::Custom(f), &values), CellValue::Int(2));
    }

    #[test]
    fn test_from_name() {
        assert!(matches!(AggFunc::from_name("sum"), AggFunc::Sum));
        assert!(matches!(AggFunc::from_name("median"), AggFunc::Named(ref n) if n == "median"));
        assert_eq!(AggFunc::Avg.name(), "avg");
        assert_eq!(format!("{:?}", AggFunc::Max), "max");
    }
}
