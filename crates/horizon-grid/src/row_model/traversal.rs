//! Lazy pre-order traversal over one of the child views.

use super::node::{ChildView, NodeStore, RowKey, RowNode};

/// Depth-first pre-order iterator over the row tree, excluding the root.
///
/// The iterator only borrows the store; creating a new one restarts the
/// walk from the root.
pub struct NodeIter<'a> {
    store: &'a NodeStore,
    stack: Vec<RowKey>,
    view: ChildView,
}

impl<'a> NodeIter<'a> {
    /// Walks every node reachable through `view`.
    pub fn new(store: &'a NodeStore, view: ChildView) -> Self {
        let stack = store
            .get(store.root())
            .map(|root| root.children(view).iter().rev().copied().collect())
            .unwrap_or_default();
        Self { store, stack, view }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a RowNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.stack.pop()?;
            let Some(node) = self.store.get(key) else {
                continue;
            };
            self.stack.extend(node.children(self.view).iter().rev());
            return Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_model::node::NodeKind;

    fn tree() -> NodeStore {
        let mut store = NodeStore::new();
        let root = store.root();
        let group = store.insert(RowNode::new("g".into(), NodeKind::Group)).unwrap();
        store.attach(root, group, None);
        for id in ["a", "b"] {
            let leaf = store.insert(RowNode::new(id.into(), NodeKind::Leaf)).unwrap();
            store.attach(group, leaf, None);
        }
        let tail = store.insert(RowNode::new("c".into(), NodeKind::Leaf)).unwrap();
        store.attach(root, tail, None);
        store
    }

    #[test]
    fn test_pre_order() {
        let store = tree();
        let ids: Vec<_> = NodeIter::new(&store, ChildView::AfterGroup)
            .map(RowNode::id)
            .collect();
        assert_eq!(ids, vec!["g", "a", "b", "c"]);
    }

    #[test]
    fn test_empty_view() {
        let store = tree();
        assert_eq!(NodeIter::new(&store, ChildView::AfterSort).count(), 0);
    }
}
