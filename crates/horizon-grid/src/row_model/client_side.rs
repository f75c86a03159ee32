//! The in-memory row model.
//!
//! `ClientSideRowModel` owns the row tree and runs the pipeline stages in
//! dependency order:
//!
//! ```text
//! records / transaction
//!        │
//!        ▼
//!   ┌─────────┐   ┌────────┐   ┌───────┐   ┌──────┐   ┌───────────┐   ┌─────────┐
//!   │  Group  │──>│ Filter │──>│ Pivot │──>│ Sort │──>│ Aggregate │──>│ Flatten │
//!   └─────────┘   └────────┘   └───────┘   └──────┘   └───────────┘   └─────────┘
//! ```
//!
//! Aggregation moves ahead of sorting whenever the sort model reads
//! aggregated values. Every entry point names the first stage that has to
//! run ([`RefreshStep`]); upstream results are reused.
//!
//! Transactions patch the tree in place and record the touched groups on a
//! [`ChangedPath`], so filtering, sorting and aggregation only revisit those
//! groups.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::{GridError, PerfSpan, Result, TreeFormatOptions};

use super::aggregation::{AggFunc, AggregationStage, CustomAggFn};
use super::changed_path::ChangedPath;
use super::column::{ColumnDef, ColumnRegistry};
use super::context::{GridContext, GridWarning};
use super::debug::RowTreeDebug;
use super::filter::{ColumnFilter, FilterModel, FilterStage, FilterState, QuickFilter};
use super::flatten::{DisplayList, FlattenStage, RowBounds};
use super::grouping::{GroupStage, is_generated_id};
use super::node::{ChildView, NodeKind, NodeStore, RowKey, RowNode};
use super::options::{GridOptions, GridSettings};
use super::pivot::{PivotColumn, PivotResult, PivotStage};
use super::signals::{ModelUpdate, RowModelSignals};
use super::sort::{SortModel, SortStage};
use super::steps::{PipelinePlan, RefreshStep, Stage};
use super::traits::RowModel;
use super::transaction::{RowNodeTransaction, Transaction, TransactionProcessor, TransactionQueue};
use super::traversal::NodeIter;
use super::value::{CellValue, Record};

/// Row model holding every record in memory.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{
///     AggFunc, ClientSideRowModel, ColumnDef, GridOptions, Record,
/// };
///
/// let mut model = ClientSideRowModel::new(
///     GridOptions::new().with_group_columns(["country"]),
///     [ColumnDef::new("v").with_agg_func(AggFunc::Sum)],
/// )
/// .unwrap();
///
/// model
///     .set_row_data(vec![
///         Record::new().with("country", "US").with("v", 1),
///         Record::new().with("country", "US").with("v", 2),
///         Record::new().with("country", "FR").with("v", 3),
///     ])
///     .unwrap();
///
/// // Groups start collapsed.
/// assert_eq!(model.displayed_row_count(), 2);
///
/// model.expand_or_collapse_all(true);
/// assert_eq!(model.displayed_row_count(), 5);
/// ```
pub struct ClientSideRowModel {
    ctx: GridContext,
    store: NodeStore,
    filter: FilterState,
    sort: SortModel,
    pivot: Option<PivotResult>,
    display: DisplayList,
    queue: TransactionQueue,
    generation: u64,
}

impl std::fmt::Debug for ClientSideRowModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSideRowModel")
            .field("nodes", &self.store.len())
            .field("displayed", &self.display.len())
            .field("generation", &self.generation)
            .field("pending_transactions", &self.queue.len())
            .finish()
    }
}

impl ClientSideRowModel {
    /// Creates an empty model.
    ///
    /// Fails when the options are inconsistent, e.g. tree data without a
    /// path function.
    pub fn new(options: GridOptions, columns: impl IntoIterator<Item = ColumnDef>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            ctx: GridContext::new(options, ColumnRegistry::new(columns)),
            store: NodeStore::new(),
            filter: FilterState::default(),
            sort: SortModel::default(),
            pivot: None,
            display: DisplayList::default(),
            queue: TransactionQueue::default(),
            generation: 0,
        })
    }

    /// The shared stage context.
    pub fn context(&self) -> &GridContext {
        &self.ctx
    }

    /// Current options.
    pub fn options(&self) -> &GridOptions {
        &self.ctx.options
    }

    /// Signals of this model.
    pub fn signals(&self) -> &RowModelSignals {
        &self.ctx.signals
    }

    /// The node arena.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    // =========================================================================
    // Row data
    // =========================================================================

    /// Replaces every record and rebuilds the tree.
    ///
    /// Selection, expansion and row heights are reset. Transactions still
    /// queued for the previous data become stale.
    pub fn set_row_data(&mut self, records: Vec<Record>) -> Result<()> {
        let ids = match self.ctx.options.row_id_fn() {
            Some(row_id) => {
                let ids: Vec<String> = records.iter().map(|r| row_id(r)).collect();
                let mut seen = HashSet::with_capacity(ids.len());
                if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
                    return Err(GridError::duplicate_row_id(dup.as_str()));
                }
                if let Some(reserved) = ids.iter().find(|id| is_generated_id(id)) {
                    return Err(GridError::ReservedRowId {
                        id: reserved.clone(),
                    });
                }
                Some(ids)
            }
            None => None,
        };

        let had_selection = self.store.iter().any(RowNode::is_selected);
        self.store.reset();
        let rows: Vec<(String, Record)> = match ids {
            Some(ids) => ids.into_iter().zip(records).collect(),
            None => records
                .into_iter()
                .map(|record| (self.store.next_auto_id(), record))
                .collect(),
        };
        let count = rows.len();
        GroupStage::new(&self.ctx).build(&mut self.store, rows);
        self.pivot = None;
        self.display = DisplayList::default();
        self.generation += 1;

        crate::grid_info!(rows = count, generation = self.generation, "row data replaced");

        self.execute(RefreshStep::Filter, ChangedPath::everything());
        self.ctx.signals.row_data_changed.emit(());
        if had_selection {
            self.ctx.signals.selection_changed.emit(Vec::new());
        }
        Ok(())
    }

    /// Monotonic counter bumped by every [`set_row_data`](Self::set_row_data).
    pub fn data_generation(&self) -> u64 {
        self.generation
    }

    /// Applies a transaction and refreshes the affected groups.
    pub fn apply_transaction(&mut self, transaction: Transaction) -> RowNodeTransaction {
        let selected_before = self.selected_ids();
        let mut path = ChangedPath::new();
        let result = TransactionProcessor::new(&self.ctx).apply(&mut self.store, transaction, &mut path);
        self.after_transactions(std::slice::from_ref(&result), path, selected_before);
        result
    }

    /// Applies a transaction that was prepared against `generation`.
    ///
    /// Fails without touching the tree when the data has been replaced
    /// since.
    pub fn apply_transaction_for(
        &mut self,
        generation: u64,
        transaction: Transaction,
    ) -> Result<RowNodeTransaction> {
        if generation != self.generation {
            return Err(GridError::StaleGeneration {
                queued: generation,
                current: self.generation,
            });
        }
        Ok(self.apply_transaction(transaction))
    }

    /// Queues a transaction for the next [`flush_transactions`](Self::flush_transactions).
    pub fn queue_transaction(&mut self, transaction: Transaction) {
        self.queue.push(self.generation, transaction);
        tracing::trace!(
            target: targets::TRANSACTION,
            pending = self.queue.len(),
            "transaction queued"
        );
    }

    /// Number of queued transactions.
    pub fn pending_transactions(&self) -> usize {
        self.queue.len()
    }

    /// Applies every queued transaction in order and runs the pipeline once.
    ///
    /// Transactions queued before the data was replaced are discarded with
    /// a [`GridWarning::StaleTransaction`]; the returned results only cover
    /// the applied ones.
    pub fn flush_transactions(&mut self) -> Vec<RowNodeTransaction> {
        let batch = self.queue.drain();
        if batch.is_empty() {
            return Vec::new();
        }

        let selected_before = self.selected_ids();
        let mut path = ChangedPath::new();
        let mut results = Vec::with_capacity(batch.len());
        let processor = TransactionProcessor::new(&self.ctx);
        for (queued, transaction) in batch {
            if queued != self.generation {
                self.ctx.warn(GridWarning::StaleTransaction {
                    queued,
                    current: self.generation,
                });
                continue;
            }
            results.push(processor.apply(&mut self.store, transaction, &mut path));
        }

        tracing::debug!(
            target: targets::TRANSACTION,
            applied = results.len(),
            "transaction batch flushed"
        );
        self.after_transactions(&results, path, selected_before);
        results
    }

    fn after_transactions(
        &mut self,
        results: &[RowNodeTransaction],
        path: ChangedPath,
        selected_before: Vec<String>,
    ) {
        if results.iter().all(RowNodeTransaction::is_empty) {
            return;
        }
        self.execute(RefreshStep::Filter, path);
        self.ctx.signals.row_data_changed.emit(());

        let selected_after = self.selected_ids();
        if selected_after != selected_before {
            self.ctx.signals.selection_changed.emit(selected_after);
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Re-runs the pipeline from `step` over the whole tree.
    pub fn refresh(&mut self, step: RefreshStep) {
        self.execute(step, ChangedPath::everything());
    }

    fn execute(&mut self, step: RefreshStep, mut path: ChangedPath) {
        let _perf = PerfSpan::new(span_names::PIPELINE);
        let reads_aggregates = self.sort.reads_aggregates(&self.ctx, self.pivot.as_ref());
        let plan = PipelinePlan::for_step(step, reads_aggregates);
        tracing::debug!(
            target: targets::ROW_MODEL,
            ?step,
            stages = ?plan.stages(),
            incremental = path.is_active(),
            "pipeline run"
        );

        for &stage in plan.stages() {
            match stage {
                Stage::Group => {
                    self.regroup();
                    path = ChangedPath::everything();
                }
                Stage::Filter => {
                    FilterStage::new(&self.ctx, &self.filter).execute(&mut self.store, &path);
                }
                Stage::Pivot => {
                    let pivot = PivotStage::new(&self.ctx).execute(&self.store);
                    if pivot != self.pivot {
                        let ids = pivot.as_ref().map(PivotResult::column_ids).unwrap_or_default();
                        self.pivot = pivot;
                        path.deactivate();
                        self.ctx.signals.pivot_columns_changed.emit(ids);
                    }
                }
                Stage::Aggregate => {
                    AggregationStage::new(&self.ctx, self.pivot.as_ref()).execute(&mut self.store, &path);
                }
                Stage::Sort => {
                    SortStage::new(&self.ctx, &self.sort).execute(&mut self.store, &path);
                }
                Stage::Flatten => {
                    FlattenStage::new(&self.ctx).execute(&mut self.store, &mut self.display);
                }
            }
        }

        if plan.contains(Stage::Flatten) {
            self.ctx.signals.model_updated.emit(ModelUpdate {
                step,
                displayed_row_count: self.display.len(),
                generation: self.generation,
            });
        }
    }

    /// Rebuilds the tree from the current leaves, keeping row ids and the
    /// per-row state of nodes whose ids survive.
    fn regroup(&mut self) {
        struct Kept {
            expanded: bool,
            selected: bool,
            manual_height: Option<f64>,
        }

        let mut leaves: Vec<(u64, String, Record)> = Vec::new();
        let mut kept: HashMap<String, Kept> = HashMap::new();
        for node in self.store.iter() {
            if node.kind() == NodeKind::Root || node.is_footer() {
                continue;
            }
            kept.insert(
                node.id().to_string(),
                Kept {
                    expanded: node.expanded,
                    selected: node.selected,
                    manual_height: node.manual_height,
                },
            );
            if let (NodeKind::Leaf, Some(data)) = (node.kind(), node.data()) {
                leaves.push((node.seq, node.id().to_string(), data.clone()));
            }
        }
        leaves.sort_by_key(|(seq, _, _)| *seq);

        self.store.clear_nodes();
        let rows = leaves.into_iter().map(|(_, id, data)| (id, data)).collect();
        GroupStage::new(&self.ctx).build(&mut self.store, rows);

        for key in self.store.keys() {
            let Some(node) = self.store.get_mut(key) else {
                continue;
            };
            if let Some(state) = kept.get(&node.id) {
                node.expanded = state.expanded;
                node.selected = state.selected;
                node.manual_height = state.manual_height;
            }
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replaces the settings and rebuilds everything.
    pub fn set_settings(&mut self, settings: GridSettings) {
        self.ctx.options.settings = settings;
        for key in self.store.keys() {
            if let Some(node) = self.store.get_mut(key) {
                node.quick_filter_text = None;
            }
        }
        self.refresh(RefreshStep::Everything);
    }

    /// Changes the row grouping columns and regroups.
    pub fn set_group_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx
            .options
            .set_group_columns(columns.into_iter().map(Into::into).collect());
        self.refresh(RefreshStep::Everything);
    }

    /// Turns pivot mode on or off.
    pub fn set_pivot_mode(&mut self, enabled: bool) {
        self.ctx.options.settings.pivot_mode = enabled;
        self.refresh(RefreshStep::Pivot);
    }

    /// Changes the pivot columns.
    pub fn set_pivot_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctx
            .options
            .set_pivot_columns(columns.into_iter().map(Into::into).collect());
        self.refresh(RefreshStep::Pivot);
    }

    /// Pivot result columns of the last pivot run.
    pub fn pivot_result_columns(&self) -> &[PivotColumn] {
        self.pivot
            .as_ref()
            .map(PivotResult::columns)
            .unwrap_or_default()
    }

    /// Sets or clears the aggregation function of a column.
    pub fn set_column_agg_func(&mut self, col_id: &str, agg_func: Option<AggFunc>) -> Result<()> {
        let column = self
            .ctx
            .columns
            .get_mut(col_id)
            .ok_or_else(|| GridError::unknown_column(col_id))?;
        column.set_agg_func(agg_func);
        self.refresh(RefreshStep::Pivot);
        Ok(())
    }

    /// Registers an aggregation function that columns can name with
    /// [`AggFunc::Named`].
    pub fn register_agg_func<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[CellValue]) -> CellValue + Send + Sync + 'static,
    {
        let f: CustomAggFn = Arc::new(f);
        self.ctx.agg_funcs.insert(name.into(), f);
        self.refresh(RefreshStep::Pivot);
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Replaces the column filter model.
    pub fn set_filter_model(&mut self, model: FilterModel) {
        self.filter.model = model;
        self.on_filter_changed();
    }

    /// The column filter model.
    pub fn filter_model(&self) -> &FilterModel {
        &self.filter.model
    }

    /// Sets or clears the filter of one column.
    pub fn set_column_filter(&mut self, col_id: &str, filter: Option<ColumnFilter>) {
        self.filter.model.set(col_id, filter);
        self.on_filter_changed();
    }

    /// Sets the quick filter text. Blank text clears it.
    pub fn set_quick_filter(&mut self, text: &str) {
        self.filter.quick = QuickFilter::parse(text);
        self.on_filter_changed();
    }

    /// The active quick filter.
    pub fn quick_filter(&self) -> Option<&QuickFilter> {
        self.filter.quick.as_ref()
    }

    /// Whether a column, quick or external filter is active.
    pub fn is_any_filter_present(&self) -> bool {
        FilterStage::new(&self.ctx, &self.filter).is_active()
    }

    fn on_filter_changed(&mut self) {
        self.refresh(RefreshStep::Filter);
        self.ctx.signals.filter_changed.emit(());
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Replaces the sort model.
    ///
    /// Descriptors that cannot sort anything are reported as warnings and
    /// leave rows in their current order.
    pub fn set_sort_model(&mut self, model: SortModel) {
        for warning in model.validate(&self.ctx) {
            self.ctx.warn(warning);
        }
        self.sort = model;
        self.refresh(RefreshStep::Sort);
        self.ctx.signals.sort_changed.emit(());
    }

    /// The sort model.
    pub fn sort_model(&self) -> &SortModel {
        &self.sort
    }

    // =========================================================================
    // Expansion, selection, heights
    // =========================================================================

    /// Expands or collapses one row.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.expanded == expanded {
            return Ok(());
        }
        node.expanded = expanded;
        self.refresh(RefreshStep::Map);
        self.ctx.signals.expanded_changed.emit((id.to_string(), expanded));
        Ok(())
    }

    /// Expands or collapses every group.
    pub fn expand_or_collapse_all(&mut self, expand: bool) {
        let mut changed = Vec::new();
        for key in self.store.keys() {
            let Some(node) = self.store.get_mut(key) else {
                continue;
            };
            if node.kind != NodeKind::Root && node.is_group() && node.expanded != expand {
                node.expanded = expand;
                changed.push(node.id.clone());
            }
        }
        crate::grid_debug!(expand, groups = changed.len(), "expand or collapse all");
        self.refresh(RefreshStep::Map);
        for id in changed {
            self.ctx.signals.expanded_changed.emit((id, expand));
        }
    }

    /// Selects or deselects one row.
    pub fn set_selected(&mut self, id: &str, selected: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.selected == selected {
            return Ok(());
        }
        node.selected = selected;
        let ids = self.selected_ids();
        self.ctx.signals.selection_changed.emit(ids);
        Ok(())
    }

    /// Deselects every row.
    pub fn clear_selection(&mut self) {
        let mut changed = false;
        for key in self.store.keys() {
            if let Some(node) = self.store.get_mut(key) {
                changed |= node.selected;
                node.selected = false;
            }
        }
        if changed {
            self.ctx.signals.selection_changed.emit(Vec::new());
        }
    }

    /// Selected rows in insertion order.
    pub fn selected_nodes(&self) -> Vec<&RowNode> {
        let mut nodes: Vec<&RowNode> = self.store.iter().filter(|n| n.is_selected()).collect();
        nodes.sort_by_key(|n| n.seq);
        nodes
    }

    fn selected_ids(&self) -> Vec<String> {
        self.selected_nodes()
            .into_iter()
            .map(|n| n.id().to_string())
            .collect()
    }

    /// Overrides the height of one row. `None` restores the computed height.
    pub fn set_row_height(&mut self, id: &str, height: Option<f64>) -> Result<()> {
        self.node_mut(id)?.manual_height = height;
        self.refresh(RefreshStep::Map);
        Ok(())
    }

    /// Drops every height override.
    pub fn reset_row_heights(&mut self) {
        for key in self.store.keys() {
            if let Some(node) = self.store.get_mut(key) {
                node.manual_height = None;
            }
        }
        self.refresh(RefreshStep::Map);
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut RowNode> {
        self.store
            .key_of(id)
            .and_then(|key| self.store.get_mut(key))
            .ok_or_else(|| GridError::unknown_row(id))
    }

    // =========================================================================
    // Lookup and traversal
    // =========================================================================

    /// Looks up a row by id.
    pub fn get_row_node(&self, id: &str) -> Option<&RowNode> {
        self.store.by_id(id)
    }

    /// Looks up a row by key.
    pub fn node(&self, key: RowKey) -> Option<&RowNode> {
        self.store.get(key)
    }

    /// The root node.
    pub fn root_node(&self) -> Option<&RowNode> {
        self.store.get(self.store.root())
    }

    /// Number of displayed rows.
    pub fn displayed_row_count(&self) -> usize {
        self.display.len()
    }

    /// The row at a display index.
    pub fn displayed_row_at_index(&self, index: usize) -> Option<&RowNode> {
        self.display.key_at(index).and_then(|key| self.store.get(key))
    }

    /// Displayed rows in order.
    pub fn displayed_rows(&self) -> impl Iterator<Item = &RowNode> {
        self.display.keys().iter().filter_map(|&key| self.store.get(key))
    }

    /// Display index of the row covering `pixel`.
    pub fn row_index_at_pixel(&self, pixel: f64) -> Option<usize> {
        self.display.index_at_pixel(pixel)
    }

    /// Geometry of the row at a display index.
    pub fn row_bounds(&self, index: usize) -> Option<RowBounds> {
        self.display.bounds(index)
    }

    /// Combined height of the displayed rows.
    pub fn total_height(&self) -> f64 {
        self.display.total_height()
    }

    /// Every node below the root, builder order.
    pub fn nodes(&self) -> NodeIter<'_> {
        NodeIter::new(&self.store, ChildView::AfterGroup)
    }

    /// Nodes that passed the filter, builder order.
    pub fn nodes_after_filter(&self) -> NodeIter<'_> {
        NodeIter::new(&self.store, ChildView::AfterFilter)
    }

    /// Nodes that passed the filter, sorted order.
    pub fn nodes_after_sort(&self) -> NodeIter<'_> {
        NodeIter::new(&self.store, ChildView::AfterSort)
    }

    /// Visits every node below the root.
    pub fn for_each_node(&self, visitor: impl FnMut(&RowNode)) {
        self.nodes().for_each(visitor);
    }

    /// Visits the nodes that passed the filter.
    pub fn for_each_node_after_filter(&self, visitor: impl FnMut(&RowNode)) {
        self.nodes_after_filter().for_each(visitor);
    }

    /// Visits the nodes that passed the filter in sorted order.
    pub fn for_each_node_after_filter_and_sort(&self, visitor: impl FnMut(&RowNode)) {
        self.nodes_after_sort().for_each(visitor);
    }

    /// Visits every row holding a record, in insertion order, filtered or
    /// not.
    pub fn for_each_leaf_node(&self, visitor: impl FnMut(&RowNode)) {
        let mut leaves: Vec<&RowNode> = self
            .store
            .iter()
            .filter(|n| n.kind() == NodeKind::Leaf && n.data().is_some())
            .collect();
        leaves.sort_by_key(|n| n.seq);
        leaves.into_iter().for_each(visitor);
    }

    /// Renders the tree as text.
    pub fn format_tree(&self, options: &TreeFormatOptions) -> String {
        RowTreeDebug::with_options(options.clone()).format(&self.store)
    }
}

impl RowModel for ClientSideRowModel {
    fn displayed_row_count(&self) -> usize {
        self.display.len()
    }

    fn displayed_row_at_index(&self, index: usize) -> Option<&RowNode> {
        ClientSideRowModel::displayed_row_at_index(self, index)
    }

    fn row_index_at_pixel(&self, pixel: f64) -> Option<usize> {
        self.display.index_at_pixel(pixel)
    }

    fn row_bounds(&self, index: usize) -> Option<RowBounds> {
        self.display.bounds(index)
    }

    fn signals(&self) -> &RowModelSignals {
        &self.ctx.signals
    }

    fn total_height(&self) -> f64 {
        self.display.total_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::filter::{FilterCondition, FilterOperator};
    use crate::row_model::sort::SortDescriptor;
    use parking_lot::Mutex;

    fn model(group: &[&str]) -> ClientSideRowModel {
        let mut model = ClientSideRowModel::new(
            GridOptions::new()
                .with_group_columns(group.iter().copied())
                .with_row_id(|r| r.value("id").to_key_string()),
            [ColumnDef::new("v").with_agg_func(AggFunc::Sum)],
        )
        .unwrap();
        model
            .set_row_data(vec![
                Record::new().with("id", 1).with("g", "A").with("v", 10),
                Record::new().with("id", 2).with("g", "A").with("v", 20),
                Record::new().with("id", 3).with("g", "B").with("v", 5),
            ])
            .unwrap();
        model
    }

    fn displayed_ids(model: &ClientSideRowModel) -> Vec<String> {
        model.displayed_rows().map(|n| n.id().to_string()).collect()
    }

    #[test]
    fn test_flat_rows_display_in_order() {
        let model = model(&[]);
        assert_eq!(displayed_ids(&model), vec!["1", "2", "3"]);
        assert_eq!(model.row_bounds(2), Some(RowBounds { top: 50.0, height: 25.0 }));
        assert_eq!(model.row_index_at_pixel(30.0), Some(1));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut model = model(&[]);
        let err = model
            .set_row_data(vec![Record::new().with("id", 1), Record::new().with("id", 1)])
            .unwrap_err();
        assert!(matches!(err, GridError::DuplicateRowId { .. }));
        assert_eq!(model.displayed_row_count(), 3);
    }

    #[test]
    fn test_tree_data_requires_path() {
        let err = ClientSideRowModel::new(GridOptions::new().with_tree_data(true), []).unwrap_err();
        assert!(matches!(err, GridError::MissingTreeDataPath));
    }

    #[test]
    fn test_regroup_keeps_selection() {
        let mut model = model(&["g"]);
        model.set_selected("2", true).unwrap();
        model.set_group_columns(Vec::<String>::new());
        assert_eq!(displayed_ids(&model), vec!["1", "2", "3"]);
        assert!(model.get_row_node("2").unwrap().is_selected());
    }

    #[test]
    fn test_set_expanded_unknown_row() {
        let mut model = model(&["g"]);
        assert!(matches!(
            model.set_expanded("nope", true),
            Err(GridError::UnknownRow { .. })
        ));
    }

    #[test]
    fn test_set_column_agg_func_unknown_column() {
        let mut model = model(&["g"]);
        assert!(matches!(
            model.set_column_agg_func("price", Some(AggFunc::Max)),
            Err(GridError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_model_updated_emitted_per_refresh() {
        let mut model = model(&["g"]);
        let updates = Arc::new(Mutex::new(Vec::new()));
        let updates_clone = updates.clone();
        model
            .signals()
            .model_updated
            .connect(move |u| updates_clone.lock().push(*u));

        model.set_column_filter(
            "v",
            Some(ColumnFilter::condition(FilterCondition::new(
                FilterOperator::GreaterThan,
                6,
            ))),
        );
        model.set_sort_model(SortModel::new().with(SortDescriptor::desc("v")));
        model.refresh(RefreshStep::Nothing);

        let updates = updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].step, RefreshStep::Filter);
        assert_eq!(updates[1].step, RefreshStep::Sort);
        assert_eq!(updates[1].displayed_row_count, 1);
    }

    #[test]
    fn test_row_model_trait_viewport() {
        let model = model(&[]);
        let view: &dyn RowModel = &model;
        assert_eq!(view.total_height(), 75.0);
        assert_eq!(view.rows_in_viewport(10.0, 40.0), 0..2);
        assert!(!view.is_empty());
    }
}
