//! Row nodes and the arena that owns them.
//!
//! Nodes live in a [`NodeStore`], a slot map keyed by [`RowKey`]. Parent and
//! child links are stored as keys, so the tree never holds reference cycles
//! and a removed node simply stops resolving.

use std::collections::HashMap;

use horizon_grid_core::{GridError, Result};
use slotmap::{SlotMap, new_key_type};

use super::aggregation::AggData;
use super::value::{CellValue, GroupKey, Record};

new_key_type! {
    /// Arena handle of a row node.
    ///
    /// Keys are only valid for the store that issued them. A key of a removed
    /// node never resolves again, even if the slot is reused or the store is
    /// reset.
    pub struct RowKey;
}

/// The variant of a row node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The single invisible root that owns the top-level rows.
    Root,
    /// A node wrapping a user record.
    Leaf,
    /// A synthetic group created by row grouping.
    Group,
    /// A tree-data path element that has no record of its own.
    Filler,
    /// A footer row shown after an expanded group's children.
    Footer,
}

/// Which of the three child views to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildView {
    /// Children in builder order, before filtering.
    AfterGroup,
    /// Children that passed the filter, builder order.
    AfterFilter,
    /// Filtered children in sorted order.
    AfterSort,
}

/// A node of the row tree.
///
/// Computed state (`row_index`, `row_top`, `agg_data`, the filtered and
/// sorted child views) is owned by the pipeline and only exposed read-only.
#[derive(Debug, Clone)]
pub struct RowNode {
    pub(crate) key: RowKey,
    pub(crate) id: String,
    pub(crate) kind: NodeKind,
    pub(crate) data: Option<Record>,
    pub(crate) level: i32,
    pub(crate) parent: Option<RowKey>,
    pub(crate) group_key: Option<CellValue>,
    pub(crate) group_column: Option<String>,
    pub(crate) children_after_group: Vec<RowKey>,
    pub(crate) children_after_filter: Vec<RowKey>,
    pub(crate) children_after_sort: Vec<RowKey>,
    pub(crate) passes_filter: bool,
    pub(crate) leaf_count: usize,
    pub(crate) expanded: bool,
    pub(crate) selected: bool,
    pub(crate) row_index: Option<usize>,
    pub(crate) row_top: Option<f64>,
    pub(crate) row_height: Option<f64>,
    pub(crate) manual_height: Option<f64>,
    pub(crate) agg_data: Option<AggData>,
    pub(crate) footer: Option<RowKey>,
    pub(crate) quick_filter_text: Option<String>,
    pub(crate) seq: u64,
}

impl RowNode {
    pub(crate) fn new(id: String, kind: NodeKind) -> Self {
        Self {
            key: RowKey::default(),
            id,
            kind,
            data: None,
            level: -1,
            parent: None,
            group_key: None,
            group_column: None,
            children_after_group: Vec::new(),
            children_after_filter: Vec::new(),
            children_after_sort: Vec::new(),
            passes_filter: true,
            leaf_count: 0,
            expanded: false,
            selected: false,
            row_index: None,
            row_top: None,
            row_height: None,
            manual_height: None,
            agg_data: None,
            footer: None,
            quick_filter_text: None,
            seq: 0,
        }
    }

    pub(crate) fn leaf(id: String, data: Record) -> Self {
        Self {
            data: Some(data),
            ..Self::new(id, NodeKind::Leaf)
        }
    }

    /// The arena key of this node.
    pub fn key(&self) -> RowKey {
        self.key
    }

    /// Stable row id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node variant.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The wrapped record, `None` for groups, fillers, footers and the root.
    pub fn data(&self) -> Option<&Record> {
        self.data.as_ref()
    }

    /// Depth from the root. The root is at level -1, top-level rows at 0.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Key of the containing node, `None` for the root.
    pub fn parent(&self) -> Option<RowKey> {
        self.parent
    }

    /// The group key (row grouping) or path element (tree data).
    pub fn group_key(&self) -> Option<&CellValue> {
        self.group_key.as_ref()
    }

    /// The column this group was created for. `None` outside row grouping.
    pub fn group_column(&self) -> Option<&str> {
        self.group_column.as_deref()
    }

    /// Returns `true` if this node groups other rows.
    ///
    /// Tree-data nodes that carry a record are groups as soon as they have
    /// children.
    pub fn is_group(&self) -> bool {
        match self.kind {
            NodeKind::Group | NodeKind::Filler | NodeKind::Root => true,
            NodeKind::Leaf => !self.children_after_group.is_empty(),
            NodeKind::Footer => false,
        }
    }

    /// Returns `true` for footer rows.
    pub fn is_footer(&self) -> bool {
        self.kind == NodeKind::Footer
    }

    /// Returns one of the three child views.
    pub fn children(&self, view: ChildView) -> &[RowKey] {
        match view {
            ChildView::AfterGroup => &self.children_after_group,
            ChildView::AfterFilter => &self.children_after_filter,
            ChildView::AfterSort => &self.children_after_sort,
        }
    }

    /// Children in builder order.
    pub fn children_after_group(&self) -> &[RowKey] {
        &self.children_after_group
    }

    /// Children that passed the filter.
    pub fn children_after_filter(&self) -> &[RowKey] {
        &self.children_after_filter
    }

    /// Filtered children in display order.
    pub fn children_after_sort(&self) -> &[RowKey] {
        &self.children_after_sort
    }

    /// Whether this node survived the last filter pass.
    pub fn passes_filter(&self) -> bool {
        self.passes_filter
    }

    /// Number of filtered leaf rows under this node.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Expand state. Only meaningful for groups.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Selection state.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Display index, `None` when the row is not displayed.
    pub fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    /// Pixel offset of the row, `None` when the row is not displayed.
    pub fn row_top(&self) -> Option<f64> {
        self.row_top
    }

    /// Height assigned by the last flatten pass.
    pub fn row_height(&self) -> Option<f64> {
        self.row_height
    }

    /// Aggregated values, present on groups once aggregation has run.
    pub fn agg_data(&self) -> Option<&AggData> {
        self.agg_data.as_ref()
    }

    /// The footer row of this group, if one has been created.
    pub fn footer(&self) -> Option<RowKey> {
        self.footer
    }
}

/// Arena of row nodes plus the id index.
///
/// Every node id is registered exactly once: inserting or renaming onto an id
/// that is already taken fails.
#[derive(Debug)]
pub struct NodeStore {
    nodes: SlotMap<RowKey, RowNode>,
    ids: HashMap<String, RowKey>,
    child_lookup: HashMap<(RowKey, GroupKey), RowKey>,
    root: RowKey,
    next_auto_id: u64,
    next_seq: u64,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Id of the root node.
pub const ROOT_NODE_ID: &str = "ROOT_NODE_ID";

impl NodeStore {
    /// Creates a store holding only the root.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = insert_root(&mut nodes);
        Self {
            nodes,
            ids: HashMap::new(),
            child_lookup: HashMap::new(),
            root,
            next_auto_id: 0,
            next_seq: 0,
        }
    }

    /// Drops every node except a fresh root. Auto ids restart at zero.
    pub fn reset(&mut self) {
        self.clear_nodes();
        self.next_auto_id = 0;
        self.next_seq = 0;
    }

    /// Drops every node except a fresh root but keeps the auto id counter,
    /// so rows re-inserted after a regroup never collide with later adds.
    ///
    /// The arena is cleared in place, which retires every slot version: keys
    /// handed out before the call stay dead.
    pub(crate) fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.ids.clear();
        self.child_lookup.clear();
        self.root = insert_root(&mut self.nodes);
    }

    /// The root key.
    pub fn root(&self) -> RowKey {
        self.root
    }

    /// Looks up a node by key.
    pub fn get(&self, key: RowKey) -> Option<&RowNode> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: RowKey) -> Option<&mut RowNode> {
        self.nodes.get_mut(key)
    }

    /// Looks up a node key by row id.
    pub fn key_of(&self, id: &str) -> Option<RowKey> {
        self.ids.get(id).copied()
    }

    /// Looks up a node by row id.
    pub fn by_id(&self, id: &str) -> Option<&RowNode> {
        self.key_of(id).and_then(|key| self.nodes.get(key))
    }

    /// Returns `true` if a node with this id exists.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Number of nodes, including the root and footers.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Iterates over every node in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &RowNode> {
        self.nodes.values()
    }

    pub(crate) fn keys(&self) -> Vec<RowKey> {
        self.nodes.keys().collect()
    }

    /// Next auto-generated row id.
    pub(crate) fn next_auto_id(&mut self) -> String {
        let id = self.next_auto_id;
        self.next_auto_id += 1;
        id.to_string()
    }

    /// Inserts a detached node and registers its id.
    ///
    /// Fails with [`GridError::DuplicateRowId`] when another node already
    /// uses the id; the store is left unchanged.
    pub(crate) fn insert(&mut self, mut node: RowNode) -> Result<RowKey> {
        if self.ids.contains_key(&node.id) {
            return Err(GridError::duplicate_row_id(node.id));
        }
        node.seq = self.next_seq;
        self.next_seq += 1;
        let id = node.id.clone();
        let key = self.nodes.insert_with_key(|key| {
            node.key = key;
            node
        });
        self.ids.insert(id, key);
        Ok(key)
    }

    /// Removes a single node. Children are not touched; the caller detaches
    /// the node from its parent first.
    pub(crate) fn remove(&mut self, key: RowKey) -> Option<RowNode> {
        let node = self.nodes.remove(key)?;
        if self.ids.get(&node.id) == Some(&key) {
            self.ids.remove(&node.id);
        }
        if let (Some(parent), Some(group_key)) = (node.parent, node.group_key.as_ref()) {
            let lookup = (parent, GroupKey::from(group_key));
            if self.child_lookup.get(&lookup) == Some(&key) {
                self.child_lookup.remove(&lookup);
            }
        }
        if let Some(footer) = node.footer {
            self.remove(footer);
        }
        Some(node)
    }

    /// Changes the id a node is registered under. Fails when another node
    /// already uses `new_id`.
    pub(crate) fn rename(&mut self, key: RowKey, new_id: String) -> Result<()> {
        if self.ids.get(&new_id).is_some_and(|&owner| owner != key) {
            return Err(GridError::duplicate_row_id(new_id));
        }
        let Some(node) = self.nodes.get_mut(key) else {
            return Err(GridError::unknown_row(new_id));
        };
        if self.ids.get(&node.id) == Some(&key) {
            self.ids.remove(&node.id);
        }
        node.id = new_id.clone();
        self.ids.insert(new_id, key);
        Ok(())
    }

    /// Finds the child of `parent` created for `group_key`.
    pub(crate) fn child_by_key(&self, parent: RowKey, group_key: &CellValue) -> Option<RowKey> {
        self.child_lookup
            .get(&(parent, GroupKey::from(group_key)))
            .copied()
    }

    pub(crate) fn register_child_key(&mut self, parent: RowKey, group_key: &CellValue, child: RowKey) {
        self.child_lookup
            .insert((parent, GroupKey::from(group_key)), child);
    }

    /// Appends or inserts `child` into `parent.children_after_group`.
    pub(crate) fn attach(&mut self, parent: RowKey, child: RowKey, index: Option<usize>) {
        let level = self.nodes.get(parent).map_or(-1, |p| p.level) + 1;
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.level = level;
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let children = &mut parent_node.children_after_group;
            match index {
                Some(i) => children.insert(i.min(children.len()), child),
                None => children.push(child),
            }
        }
    }

    /// Removes `child` from its parent's child views.
    pub(crate) fn detach(&mut self, child: RowKey) -> Option<RowKey> {
        let parent = self.nodes.get(child)?.parent?;
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children_after_group.retain(|&k| k != child);
            parent_node.children_after_filter.retain(|&k| k != child);
            parent_node.children_after_sort.retain(|&k| k != child);
        }
        Some(parent)
    }

    /// Ancestors of `key`, nearest first, ending with the root.
    pub fn ancestors(&self, key: RowKey) -> Ancestors<'_> {
        Ancestors {
            store: self,
            next: self.nodes.get(key).and_then(|n| n.parent),
        }
    }
}

fn insert_root(nodes: &mut SlotMap<RowKey, RowNode>) -> RowKey {
    nodes.insert_with_key(|key| {
        let mut node = RowNode::new(ROOT_NODE_ID.to_string(), NodeKind::Root);
        node.key = key;
        node.expanded = true;
        node
    })
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    store: &'a NodeStore,
    next: Option<RowKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = RowKey;

    fn next(&mut self) -> Option<RowKey> {
        let current = self.next?;
        self.next = self.store.get(current).and_then(|n| n.parent);
        Some(current)
    }
}
