//! The set of groups touched by a transaction.
//!
//! Stages consult the changed path to decide which groups to recompute. An
//! inactive path means "everything changed"; stages then recompute the whole
//! tree.

use std::collections::HashSet;

use super::node::{NodeStore, RowKey};

/// Groups whose descendant set changed.
#[derive(Debug, Clone, Default)]
pub struct ChangedPath {
    active: bool,
    keys: HashSet<RowKey>,
}

impl ChangedPath {
    /// A path that tracks individual groups.
    pub fn new() -> Self {
        Self {
            active: true,
            keys: HashSet::new(),
        }
    }

    /// A path that covers the whole tree.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Whether the path restricts recomputation.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stops restricting recomputation.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.keys.clear();
    }

    /// Marks `key` and all of its ancestors as changed.
    pub fn add_node_and_ancestors(&mut self, store: &NodeStore, key: RowKey) {
        if !self.active {
            return;
        }
        self.keys.insert(key);
        for ancestor in store.ancestors(key) {
            if !self.keys.insert(ancestor) {
                break;
            }
        }
    }

    /// Marks only the ancestors of `key` as changed.
    pub fn add_ancestors(&mut self, store: &NodeStore, key: RowKey) {
        if let Some(parent) = store.get(key).and_then(|n| n.parent()) {
            self.add_node_and_ancestors(store, parent);
        }
    }

    /// Whether `key` has to be recomputed.
    pub fn contains(&self, key: RowKey) -> bool {
        !self.active || self.keys.contains(&key)
    }

    /// Number of tracked groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` when no group is tracked.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Tracked keys still present in `store`, deepest first.
    pub fn bottom_up(&self, store: &NodeStore) -> Vec<RowKey> {
        let mut keys: Vec<(i32, RowKey)> = self
            .keys
            .iter()
            .filter_map(|&k| store.get(k).map(|n| (n.level(), k)))
            .collect();
        keys.sort_by(|a, b| b.0.cmp(&a.0));
        keys.into_iter().map(|(_, k)| k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::node::{NodeKind, RowNode};
    use crate::row_model::value::Record;

    #[test]
    fn test_inactive_contains_everything() {
        let store = NodeStore::new();
        let path = ChangedPath::everything();
        assert!(!path.is_active());
        assert!(path.contains(store.root()));
    }

    #[test]
    fn test_ancestors_and_bottom_up_order() {
        let mut store = NodeStore::new();
        let root = store.root();
        let outer = store.insert(RowNode::new("outer".into(), NodeKind::Group)).unwrap();
        store.attach(root, outer, None);
        let inner = store.insert(RowNode::new("inner".into(), NodeKind::Group)).unwrap();
        store.attach(outer, inner, None);
        let leaf = store.insert(RowNode::leaf("1".into(), Record::new())).unwrap();
        store.attach(inner, leaf, None);

        let mut path = ChangedPath::new();
        path.add_ancestors(&store, leaf);

        assert!(path.contains(inner));
        assert!(path.contains(outer));
        assert!(path.contains(root));
        assert!(!path.contains(leaf));
        assert_eq!(path.bottom_up(&store), vec![inner, outer, root]);
    }

    #[test]
    fn test_deactivate_clears() {
        let store = NodeStore::new();
        let mut path = ChangedPath::new();
        path.add_node_and_ancestors(&store, store.root());
        assert_eq!(path.len(), 1);
        path.deactivate();
        assert!(path.is_empty());
        assert!(path.contains(store.root()));
    }
}
