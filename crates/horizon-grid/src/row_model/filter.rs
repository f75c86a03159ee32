//! Filter evaluation.
//!
//! Leaf rows are tested against the composed predicate: the per-column
//! filter model, the quick filter and the external filter, all joined with
//! AND. The result is propagated upwards: a group is visible after filtering
//! when at least one of its children is, or when the group itself matches and
//! group-level filtering is enabled.

use std::collections::BTreeMap;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::{GridError, PerfSpan, Result};
use serde::{Deserialize, Serialize};

use super::changed_path::ChangedPath;
use super::context::GridContext;
use super::node::{NodeKind, NodeStore, RowKey};
use super::options::FilterJoin;
use super::value::{CellValue, Record};

/// Condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    /// Value equals the operand. Text compares case-insensitively.
    Equals,
    /// Value differs from the operand.
    NotEqual,
    /// Value is less than the operand.
    LessThan,
    /// Value is less than or equal to the operand.
    LessThanOrEqual,
    /// Value is greater than the operand.
    GreaterThan,
    /// Value is greater than or equal to the operand.
    GreaterThanOrEqual,
    /// Value lies between the two operands, both ends inclusive.
    InRange,
    /// Text contains the operand.
    Contains,
    /// Text does not contain the operand.
    NotContains,
    /// Text starts with the operand.
    StartsWith,
    /// Text ends with the operand.
    EndsWith,
    /// Value is null or empty text.
    Blank,
    /// Value is neither null nor empty text.
    NotBlank,
}

/// One condition on a column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    /// Operator.
    pub operator: FilterOperator,
    /// First operand.
    #[serde(default)]
    pub value: CellValue,
    /// Second operand, used by `InRange`.
    #[serde(default)]
    pub value_to: CellValue,
}

impl FilterCondition {
    /// Creates a condition with one operand.
    pub fn new(operator: FilterOperator, value: impl Into<CellValue>) -> Self {
        Self {
            operator,
            value: value.into(),
            value_to: CellValue::Null,
        }
    }

    /// Creates an inclusive range condition.
    pub fn in_range(from: impl Into<CellValue>, to: impl Into<CellValue>) -> Self {
        Self {
            operator: FilterOperator::InRange,
            value: from.into(),
            value_to: to.into(),
        }
    }

    /// Creates a condition without operands (`Blank`, `NotBlank`).
    pub fn unary(operator: FilterOperator) -> Self {
        Self::new(operator, CellValue::Null)
    }

    /// Tests a value against this condition.
    pub fn matches(&self, value: &CellValue) -> bool {
        use FilterOperator::*;
        match self.operator {
            Blank => value.is_blank(),
            NotBlank => !value.is_blank(),
            Equals => values_equal(value, &self.value),
            NotEqual => !values_equal(value, &self.value),
            LessThan => ordered(value, &self.value).is_some_and(|o| o.is_lt()),
            LessThanOrEqual => ordered(value, &self.value).is_some_and(|o| o.is_le()),
            GreaterThan => ordered(value, &self.value).is_some_and(|o| o.is_gt()),
            GreaterThanOrEqual => ordered(value, &self.value).is_some_and(|o| o.is_ge()),
            InRange => {
                ordered(value, &self.value).is_some_and(|o| o.is_ge())
                    && ordered(value, &self.value_to).is_some_and(|o| o.is_le())
            }
            Contains => text(value).is_some_and(|t| t.contains(&operand(&self.value))),
            NotContains => !text(value).is_some_and(|t| t.contains(&operand(&self.value))),
            StartsWith => text(value).is_some_and(|t| t.starts_with(&operand(&self.value))),
            EndsWith => text(value).is_some_and(|t| t.ends_with(&operand(&self.value))),
        }
    }
}

fn values_equal(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::String(x), CellValue::String(y)) => x.to_lowercase() == y.to_lowercase(),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

/// Orders two values of comparable kinds. Null and mixed kinds never match.
fn ordered(a: &CellValue, b: &CellValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (CellValue::String(_), CellValue::String(_)) => Some(a.total_cmp(b)),
        _ if a.as_f64().is_some() && b.as_f64().is_some() => Some(a.total_cmp(b)),
        _ => None,
    }
}

fn text(value: &CellValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_key_string().to_lowercase())
    }
}

fn operand(value: &CellValue) -> String {
    value.to_key_string().to_lowercase()
}

/// The filter state of one column.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{CellValue, ColumnFilter, FilterCondition, FilterOperator};
///
/// let filter = ColumnFilter::any([
///     FilterCondition::new(FilterOperator::LessThan, 0),
///     FilterCondition::new(FilterOperator::GreaterThan, 100),
/// ]);
/// assert!(filter.matches(&CellValue::from(150)));
/// assert!(!filter.matches(&CellValue::from(50)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "camelCase")]
pub enum ColumnFilter {
    /// Conditions joined with AND or OR.
    #[serde(rename_all = "camelCase")]
    Conditions {
        /// The conditions.
        conditions: Vec<FilterCondition>,
        /// How the conditions combine.
        #[serde(default)]
        join: FilterJoin,
    },
    /// The value must be one of an allowed set.
    Set {
        /// Allowed values.
        values: Vec<CellValue>,
    },
}

impl ColumnFilter {
    /// A single condition.
    pub fn condition(condition: FilterCondition) -> Self {
        Self::all([condition])
    }

    /// Conditions that must all pass.
    pub fn all(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self::Conditions {
            conditions: conditions.into_iter().collect(),
            join: FilterJoin::And,
        }
    }

    /// Conditions of which one must pass.
    pub fn any(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self::Conditions {
            conditions: conditions.into_iter().collect(),
            join: FilterJoin::Or,
        }
    }

    /// A set filter.
    pub fn set<V: Into<CellValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Set {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Tests a column value.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            ColumnFilter::Conditions { conditions, join } => match join {
                FilterJoin::And => conditions.iter().all(|c| c.matches(value)),
                FilterJoin::Or => {
                    conditions.is_empty() || conditions.iter().any(|c| c.matches(value))
                }
            },
            ColumnFilter::Set { values } => values.iter().any(|v| values_equal(v, value)),
        }
    }
}

/// Per-column filters, keyed by column id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterModel {
    columns: BTreeMap<String, ColumnFilter>,
}

impl FilterModel {
    /// Creates an empty filter model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column filter, builder style.
    pub fn with(mut self, col_id: impl Into<String>, filter: ColumnFilter) -> Self {
        self.columns.insert(col_id.into(), filter);
        self
    }

    /// Sets or clears a column filter.
    pub fn set(&mut self, col_id: impl Into<String>, filter: Option<ColumnFilter>) {
        let col_id = col_id.into();
        match filter {
            Some(filter) => {
                self.columns.insert(col_id, filter);
            }
            None => {
                self.columns.remove(&col_id);
            }
        }
    }

    /// Filter of one column.
    pub fn get(&self, col_id: &str) -> Option<&ColumnFilter> {
        self.columns.get(col_id)
    }

    /// Returns `true` when no column is filtered.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over `(column id, filter)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnFilter)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a filter model from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(GridError::InvalidSettings)
    }
}

/// Free-text search across columns.
///
/// Every whitespace-separated word has to occur in the row text,
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickFilter {
    words: Vec<String>,
}

impl QuickFilter {
    /// Parses the search text. Blank text yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        (!words.is_empty()).then_some(Self { words })
    }

    /// The lowercase search words.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Tests lowercase row text.
    pub fn matches(&self, row_text: &str) -> bool {
        self.words.iter().all(|w| row_text.contains(w.as_str()))
    }
}

/// Everything the filter stage evaluates.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    /// Column filters.
    pub model: FilterModel,
    /// Quick filter.
    pub quick: Option<QuickFilter>,
}

/// Runs the filter over the row tree.
pub struct FilterStage<'a> {
    ctx: &'a GridContext,
    state: &'a FilterState,
}

impl<'a> FilterStage<'a> {
    /// Creates the stage.
    pub fn new(ctx: &'a GridContext, state: &'a FilterState) -> Self {
        Self { ctx, state }
    }

    /// Whether any filter is present.
    pub fn is_active(&self) -> bool {
        !self.state.model.is_empty()
            || self.state.quick.is_some()
            || self.ctx.options.external_filter_fn().is_some()
    }

    /// Recomputes `children_after_filter` for the groups on `path`.
    pub fn execute(&self, store: &mut NodeStore, path: &ChangedPath) {
        let _perf = PerfSpan::new(span_names::FILTER);
        let root = store.root();
        let active = self.is_active();
        self.filter_node(store, root, path, active);
        tracing::debug!(
            target: targets::FILTER,
            active,
            incremental = path.is_active(),
            visible_leaves = store.get(root).map_or(0, |r| r.leaf_count()),
            "filter stage complete"
        );
    }

    fn filter_node(&self, store: &mut NodeStore, key: RowKey, path: &ChangedPath, active: bool) -> bool {
        let Some(node) = store.get(key) else {
            return false;
        };
        let kind = node.kind();
        let has_children = !node.children_after_group().is_empty();

        if kind == NodeKind::Leaf && !has_children {
            let pass = !active || self.leaf_passes(store, key);
            if let Some(node) = store.get_mut(key) {
                node.passes_filter = pass;
                node.leaf_count = 0;
            }
            return pass;
        }

        if kind != NodeKind::Root && !path.contains(key) {
            return node.passes_filter();
        }

        if active && kind == NodeKind::Group && self.group_passes(store, key) {
            self.include_subtree(store, key);
            return true;
        }

        let self_pass = active && kind == NodeKind::Leaf && self.leaf_passes(store, key);
        let exclude_children = self.ctx.options.settings.exclude_children_when_tree_data_filtering;
        if self_pass && !exclude_children {
            self.include_subtree(store, key);
            return true;
        }

        let children = store
            .get(key)
            .map(|n| n.children_after_group().to_vec())
            .unwrap_or_default();
        let filtered: Vec<RowKey> = children
            .into_iter()
            .filter(|&child| self.filter_node(store, child, path, active))
            .collect();

        let leaf_count = count_leaves(store, &filtered);
        let pass = match kind {
            NodeKind::Root => true,
            _ => self_pass || !filtered.is_empty(),
        };
        if let Some(node) = store.get_mut(key) {
            node.children_after_filter = filtered;
            node.leaf_count = leaf_count;
            node.passes_filter = pass;
        }
        pass
    }

    /// Marks a whole subtree as passing.
    fn include_subtree(&self, store: &mut NodeStore, key: RowKey) -> usize {
        let children = store
            .get(key)
            .map(|n| n.children_after_group().to_vec())
            .unwrap_or_default();
        let mut leaf_count = 0;
        for &child in &children {
            let has_children = store
                .get(child)
                .is_some_and(|c| !c.children_after_group().is_empty());
            leaf_count += if has_children {
                self.include_subtree(store, child)
            } else {
                if let Some(node) = store.get_mut(child) {
                    node.passes_filter = true;
                    node.leaf_count = 0;
                }
                1
            };
        }
        if let Some(node) = store.get_mut(key) {
            node.children_after_filter = children;
            node.passes_filter = true;
            node.leaf_count = leaf_count;
        }
        leaf_count
    }

    fn group_passes(&self, store: &NodeStore, key: RowKey) -> bool {
        if !self.ctx.options.settings.group_level_filter {
            return false;
        }
        let Some(node) = store.get(key) else {
            return false;
        };
        let Some(group_key) = node.group_key() else {
            return false;
        };
        let column_match = node
            .group_column()
            .and_then(|col| self.state.model.get(col))
            .is_some_and(|f| f.matches(group_key));
        let quick_match = self
            .state
            .quick
            .as_ref()
            .is_some_and(|q| q.matches(&group_key.to_key_string().to_lowercase()));
        column_match || quick_match
    }

    fn leaf_passes(&self, store: &mut NodeStore, key: RowKey) -> bool {
        if let Some(quick) = &self.state.quick {
            let Some(node) = store.get_mut(key) else {
                return false;
            };
            if node.quick_filter_text.is_none() {
                node.quick_filter_text = node.data.as_ref().map(|d| self.quick_filter_text(d));
            }
            let matched = node
                .quick_filter_text
                .as_deref()
                .is_some_and(|text| quick.matches(text));
            if !matched {
                return false;
            }
        }

        let Some(node) = store.get(key) else {
            return false;
        };
        let Some(data) = node.data() else {
            return false;
        };
        if !self.columns_pass(data) {
            return false;
        }
        match self.ctx.options.external_filter_fn() {
            Some(external) => external(node),
            None => true,
        }
    }

    fn columns_pass(&self, data: &Record) -> bool {
        let model = &self.state.model;
        if model.is_empty() {
            return true;
        }
        let mut results = model
            .iter()
            .map(|(col, filter)| filter.matches(&self.ctx.columns.value_of(col, data)));
        match self.ctx.options.settings.column_filter_join {
            FilterJoin::And => results.all(|pass| pass),
            FilterJoin::Or => results.any(|pass| pass),
        }
    }

    /// Lowercase text searched by the quick filter.
    fn quick_filter_text(&self, data: &Record) -> String {
        let configured = &self.ctx.options.settings.quick_filter_columns;
        let columns = &self.ctx.columns;
        let parts: Vec<String> = if !configured.is_empty() {
            configured
                .iter()
                .map(|col| columns.value_of(col, data).to_key_string())
                .collect()
        } else if !columns.is_empty() {
            columns
                .iter()
                .filter(|c| c.in_quick_filter())
                .map(|c| c.value(data).to_key_string())
                .collect()
        } else {
            data.iter().map(|(_, v)| v.to_key_string()).collect()
        };
        parts.join("\n").to_lowercase()
    }
}

fn count_leaves(store: &NodeStore, children: &[RowKey]) -> usize {
    children
        .iter()
        .filter_map(|&k| store.get(k))
        .map(|n| {
            if n.children_after_group().is_empty() && n.kind() == NodeKind::Leaf {
                1
            } else {
                n.leaf_count()
            }
        })
        .sum()
}
