//! Group and tree building.
//!
//! Turns records into the row tree. In row-grouping mode every distinct
//! combination of group key values gets exactly one group node per level,
//! created lazily in first-seen order. In tree-data mode a path function
//! supplies the ancestor chain and missing intermediate elements become
//! filler nodes.
//!
//! The same entry points serve the full build and transactions, so an added
//! record lands in exactly the place a full rebuild would put it.

use horizon_grid_core::PerfSpan;
use horizon_grid_core::logging::span_names;

use super::changed_path::ChangedPath;
use super::context::{GridContext, GridWarning};
use super::node::{NodeKind, NodeStore, RowKey, RowNode};
use super::options::NullGroupPolicy;
use super::transaction::RemovedRow;
use super::value::{CellValue, GroupKey, Record, escape_id_text};

/// Prefix of generated group ids.
pub const GROUP_ID_PREFIX: &str = "row-group";

/// Prefix of generated tree-data filler ids.
pub const FILLER_ID_PREFIX: &str = "filler";

/// Prefix of generated footer ids, followed by the id of the footer's group.
pub const FOOTER_ID_PREFIX: &str = "rowGroupFooter_";

/// Returns `true` if `id` lies in the namespace of generated group, filler
/// or footer ids. Records may not use such ids.
pub fn is_generated_id(id: &str) -> bool {
    id.strip_prefix(GROUP_ID_PREFIX)
        .is_some_and(|rest| rest.starts_with('-'))
        || id
            .strip_prefix(FILLER_ID_PREFIX)
            .is_some_and(|rest| rest.starts_with('-'))
        || id.starts_with(FOOTER_ID_PREFIX)
}

/// Builds and patches the row tree.
pub struct GroupStage<'a> {
    ctx: &'a GridContext,
}

impl<'a> GroupStage<'a> {
    /// Creates the stage.
    pub fn new(ctx: &'a GridContext) -> Self {
        Self { ctx }
    }

    /// Builds the tree for `rows` into an emptied store.
    pub fn build(&self, store: &mut NodeStore, rows: Vec<(String, Record)>) {
        let _perf = PerfSpan::new(span_names::GROUP);
        let mut path = ChangedPath::everything();
        let count = rows.len();
        for (id, record) in rows {
            self.insert_leaf(store, id, record, None, &mut path);
        }
        crate::grid_debug!(rows = count, nodes = store.len(), "row tree built");
    }

    /// Inserts one record. `index` positions the row among its siblings.
    pub fn insert_leaf(
        &self,
        store: &mut NodeStore,
        id: String,
        record: Record,
        index: Option<usize>,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        if self.ctx.options.is_tree_data() {
            return self.insert_tree_leaf(store, id, record, index, path);
        }

        let parent = self.resolve_group_parent(store, &record, path)?;
        let key = self.insert_node(store, RowNode::leaf(id, record))?;
        store.attach(parent, key, index);
        path.add_ancestors(store, key);
        Some(key)
    }

    /// Inserts a node, reporting an id that is already taken as a
    /// [`GridWarning::DuplicateRow`].
    fn insert_node(&self, store: &mut NodeStore, node: RowNode) -> Option<RowKey> {
        let id = node.id().to_string();
        match store.insert(node) {
            Ok(key) => Some(key),
            Err(_) => {
                self.ctx.warn(GridWarning::DuplicateRow { id });
                None
            }
        }
    }

    /// Removes a leaf and prunes groups left without children.
    ///
    /// A tree-data node that still has children stays in place as a filler.
    pub fn remove_leaf(
        &self,
        store: &mut NodeStore,
        key: RowKey,
        path: &mut ChangedPath,
    ) -> Option<RemovedRow> {
        let node = store.get(key)?;
        if node.kind() != NodeKind::Leaf {
            return None;
        }

        if !node.children_after_group().is_empty() {
            let removed = RemovedRow {
                id: node.id().to_string(),
                data: node.data().cloned().unwrap_or_default(),
            };
            self.convert_to_filler(store, key);
            path.add_node_and_ancestors(store, key);
            return Some(removed);
        }

        let parent = store.detach(key);
        let removed = store.remove(key)?;
        if let Some(parent) = parent {
            path.add_node_and_ancestors(store, parent);
            self.prune(store, parent);
        }
        Some(RemovedRow {
            id: removed.id,
            data: removed.data.unwrap_or_default(),
        })
    }

    /// Replaces the record of a leaf, moving it when its group keys or
    /// tree path changed. Returns the key the row lives under afterwards.
    pub fn update_leaf(
        &self,
        store: &mut NodeStore,
        key: RowKey,
        record: Record,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        if self.ctx.options.is_tree_data() {
            return self.update_tree_leaf(store, key, record, path);
        }

        let old_parent = store.get(key)?.parent();
        let new_parent = self.resolve_group_parent(store, &record, path)?;
        if let Some(node) = store.get_mut(key) {
            node.data = Some(record);
            node.quick_filter_text = None;
        }

        if old_parent != Some(new_parent) {
            store.detach(key);
            store.attach(new_parent, key, None);
            if let Some(old) = old_parent {
                path.add_node_and_ancestors(store, old);
                self.prune(store, old);
            }
        }
        path.add_ancestors(store, key);
        Some(key)
    }

    fn resolve_group_parent(
        &self,
        store: &mut NodeStore,
        record: &Record,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        let options = &self.ctx.options;
        let mut parent = store.root();
        for column in options.group_columns() {
            let value = self.ctx.columns.value_of(column, record);
            if value.is_null() && options.settings.null_group_policy == NullGroupPolicy::Skip {
                break;
            }
            parent = match store.child_by_key(parent, &value) {
                Some(group) => group,
                None => self.create_group(store, parent, column, value, path)?,
            };
        }
        Some(parent)
    }

    fn create_group(
        &self,
        store: &mut NodeStore,
        parent: RowKey,
        column: &str,
        value: CellValue,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        let parent_id = if parent == store.root() {
            GROUP_ID_PREFIX.to_string()
        } else {
            store
                .get(parent)
                .map_or_else(|| GROUP_ID_PREFIX.to_string(), |p| p.id().to_string())
        };
        let id = format!(
            "{parent_id}-{}-{}",
            escape_id_text(column, '-'),
            GroupKey::from(&value).id_segment()
        );
        let level = store.get(parent).map_or(0, |p| p.level() + 1);

        let mut node = RowNode::new(id, NodeKind::Group);
        node.expanded = self.ctx.options.settings.is_expanded_by_default(level);
        node.group_column = Some(column.to_string());
        node.group_key = Some(value.clone());

        let key = self.insert_node(store, node)?;
        store.attach(parent, key, None);
        store.register_child_key(parent, &value, key);
        path.add_node_and_ancestors(store, key);
        crate::grid_trace!(column, key = %value, level, "group created");
        Some(key)
    }

    fn insert_tree_leaf(
        &self,
        store: &mut NodeStore,
        id: String,
        record: Record,
        index: Option<usize>,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        let segments = self.data_path(&record);
        let Some((own, ancestors)) = segments.split_last() else {
            self.ctx.warn(GridWarning::EmptyPath { id });
            return None;
        };

        let mut parent = store.root();
        for (depth, segment) in ancestors.iter().enumerate() {
            let value = CellValue::String(segment.clone());
            parent = match store.child_by_key(parent, &value) {
                Some(existing) => existing,
                None => self.create_filler(store, parent, value, &segments[..=depth], path)?,
            };
        }

        let own_key = CellValue::String(own.clone());
        match store.child_by_key(parent, &own_key) {
            Some(existing) if store.get(existing).map(RowNode::kind) == Some(NodeKind::Filler) => {
                if store.rename(existing, id.clone()).is_err() {
                    self.ctx.warn(GridWarning::DuplicateRow { id });
                    return None;
                }
                if let Some(node) = store.get_mut(existing) {
                    node.kind = NodeKind::Leaf;
                    node.data = Some(record);
                    node.quick_filter_text = None;
                }
                path.add_node_and_ancestors(store, existing);
                Some(existing)
            }
            Some(_) => {
                self.ctx.warn(GridWarning::DuplicatePath {
                    id: id.clone(),
                    path: segments.clone(),
                });
                self.attach_tree_node(store, parent, id, record, own_key, index, path, false)
            }
            None => self.attach_tree_node(store, parent, id, record, own_key, index, path, true),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attach_tree_node(
        &self,
        store: &mut NodeStore,
        parent: RowKey,
        id: String,
        record: Record,
        own_key: CellValue,
        index: Option<usize>,
        path: &mut ChangedPath,
        register: bool,
    ) -> Option<RowKey> {
        let level = store.get(parent).map_or(0, |p| p.level() + 1);
        let mut node = RowNode::leaf(id, record);
        node.expanded = self.ctx.options.settings.is_expanded_by_default(level);
        node.group_key = Some(own_key.clone());
        let key = self.insert_node(store, node)?;
        store.attach(parent, key, index);
        if register {
            store.register_child_key(parent, &own_key, key);
        }
        path.add_ancestors(store, key);
        Some(key)
    }

    fn create_filler(
        &self,
        store: &mut NodeStore,
        parent: RowKey,
        value: CellValue,
        segments: &[String],
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        let level = store.get(parent).map_or(0, |p| p.level() + 1);
        let mut node = RowNode::new(filler_id(segments), NodeKind::Filler);
        node.expanded = self.ctx.options.settings.is_expanded_by_default(level);
        node.group_key = Some(value.clone());

        let key = self.insert_node(store, node)?;
        store.attach(parent, key, None);
        store.register_child_key(parent, &value, key);
        path.add_node_and_ancestors(store, key);
        Some(key)
    }

    fn update_tree_leaf(
        &self,
        store: &mut NodeStore,
        key: RowKey,
        record: Record,
        path: &mut ChangedPath,
    ) -> Option<RowKey> {
        let new_path = self.data_path(&record);
        if new_path == tree_path(store, key) {
            let node = store.get_mut(key)?;
            node.data = Some(record);
            node.quick_filter_text = None;
            path.add_node_and_ancestors(store, key);
            return Some(key);
        }

        let node = store.get(key)?;
        let id = node.id().to_string();
        let selected = node.is_selected();
        self.remove_leaf(store, key, path)?;
        let moved = self.insert_leaf(store, id, record, None, path)?;
        if let Some(node) = store.get_mut(moved) {
            node.selected = selected;
        }
        Some(moved)
    }

    fn convert_to_filler(&self, store: &mut NodeStore, key: RowKey) {
        let id = filler_id(&tree_path(store, key));
        if store.rename(key, id.clone()).is_err() {
            self.ctx.warn(GridWarning::DuplicateRow { id });
        }
        if let Some(node) = store.get_mut(key) {
            node.kind = NodeKind::Filler;
            node.data = None;
            node.selected = false;
            node.quick_filter_text = None;
        }
    }

    /// Removes childless groups and fillers from `key` upwards.
    fn prune(&self, store: &mut NodeStore, mut key: RowKey) {
        loop {
            let Some(node) = store.get(key) else {
                return;
            };
            let empty = node.children_after_group().is_empty();
            if !empty || !matches!(node.kind(), NodeKind::Group | NodeKind::Filler) {
                return;
            }
            let parent = store.detach(key);
            store.remove(key);
            crate::grid_trace!(group = ?key, "empty group removed");
            match parent {
                Some(parent) => key = parent,
                None => return,
            }
        }
    }

    fn data_path(&self, record: &Record) -> Vec<String> {
        self.ctx
            .options
            .data_path_fn()
            .map(|f| f(record))
            .unwrap_or_default()
    }
}

/// Tree-data path of a node: the keys of its ancestors and itself.
pub fn tree_path(store: &NodeStore, key: RowKey) -> Vec<String> {
    let mut segments: Vec<String> = std::iter::once(key)
        .chain(store.ancestors(key))
        .filter_map(|k| store.get(k))
        .filter_map(|n| n.group_key().map(CellValue::to_key_string))
        .collect();
    segments.reverse();
    segments
}

/// `filler-` followed by the path segments joined with `/`. A `/` or `~`
/// inside a segment is escaped with `~`.
fn filler_id(segments: &[String]) -> String {
    let escaped: Vec<String> = segments
        .iter()
        .map(|segment| escape_id_text(segment, '/'))
        .collect();
    format!("{FILLER_ID_PREFIX}-{}", escaped.join("/"))
}
