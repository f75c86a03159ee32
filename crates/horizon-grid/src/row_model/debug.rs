//! Text dumps of the row tree.

use std::fmt::Write;

use horizon_grid_core::TreeFormatOptions;

use super::node::{ChildView, NodeKind, NodeStore, RowKey, RowNode};

/// Renders a row tree as indented text.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::{ClientSideRowModel, GridOptions, Record};
/// use horizon_grid_core::TreeFormatOptions;
///
/// let mut model = ClientSideRowModel::new(
///     GridOptions::new().with_group_columns(["g"]),
///     [],
/// ).unwrap();
/// model.set_row_data(vec![Record::new().with("g", "A")]).unwrap();
///
/// let dump = model.format_tree(&TreeFormatOptions::minimal());
/// assert!(dump.contains("g: A (1)"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RowTreeDebug {
    options: TreeFormatOptions,
}

impl RowTreeDebug {
    /// Creates a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Formats the whole tree below the root.
    pub fn format(&self, store: &NodeStore) -> String {
        let mut output = String::new();
        let root = store.get(store.root());
        let leaves = root.map_or(0, RowNode::leaf_count);
        let _ = writeln!(output, "Rows ({leaves} after filter, {} nodes):", store.len());

        let children = root.map(|r| self.children_of(r)).unwrap_or_default();
        if children.is_empty() {
            let _ = writeln!(output, "  (empty)");
        }
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_node(store, child, 1, i + 1 == count, &mut output);
        }
        output
    }

    fn children_of(&self, node: &RowNode) -> Vec<RowKey> {
        let view = if self.options.include_filtered {
            ChildView::AfterGroup
        } else {
            ChildView::AfterSort
        };
        let mut children = node.children(view).to_vec();
        if let Some(footer) = node.footer() {
            children.push(footer);
        }
        children
    }

    fn format_node(&self, store: &NodeStore, key: RowKey, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = store.get(key) else {
            return;
        };

        output.push_str(&self.options.line_prefix(depth, is_last));
        output.push_str(&label(node));

        if self.options.show_ids {
            let _ = write!(output, " [{}]", node.id());
        }
        if self.options.show_row_index {
            if let Some(index) = node.row_index() {
                let _ = write!(output, " #{index}");
            }
        }
        if self.options.include_filtered && !node.passes_filter() {
            output.push_str(" (filtered)");
        }
        if self.options.show_aggregates {
            if let Some(agg) = node.agg_data().filter(|a| !a.is_empty()) {
                let values: Vec<String> = agg
                    .iter()
                    .map(|(col, value)| format!("{col}={}", value.value()))
                    .collect();
                let _ = write!(output, " {{{}}}", values.join(", "));
            }
        }
        output.push('\n');

        let children = self.children_of(node);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_node(store, child, depth + 1, i + 1 == count, output);
        }
    }
}

fn label(node: &RowNode) -> String {
    match node.kind() {
        NodeKind::Group => format!(
            "{}: {} ({})",
            node.group_column().unwrap_or_default(),
            node.group_key().map(|k| k.to_key_string()).unwrap_or_default(),
            node.leaf_count()
        ),
        NodeKind::Footer if node.level() < 0 => "Total".to_string(),
        NodeKind::Footer => "Footer".to_string(),
        NodeKind::Root => "(root)".to_string(),
        NodeKind::Filler | NodeKind::Leaf => match node.group_key() {
            Some(key) => key.to_key_string(),
            None => node.id().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_grid_core::TreeStyle;

    fn store() -> NodeStore {
        let mut store = NodeStore::new();
        let root = store.root();
        let mut group = RowNode::new("row-group-g-A".into(), NodeKind::Group);
        group.group_key = Some("A".into());
        group.group_column = Some("g".into());
        group.leaf_count = 1;
        let group = store.insert(group).unwrap();
        store.attach(root, group, None);
        let leaf = store.insert(RowNode::new("1".into(), NodeKind::Leaf)).unwrap();
        store.attach(group, leaf, None);
        store
    }

    #[test]
    fn test_unfiltered_dump() {
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            include_filtered: true,
            show_row_index: false,
            ..Default::default()
        };
        let dump = RowTreeDebug::with_options(options).format(&store());
        assert!(dump.contains("`-- g: A (1) [row-group-g-A]"));
        assert!(dump.contains("|  `-- 1 [1]"));
    }

    #[test]
    fn test_sorted_view_empty_before_pipeline() {
        let dump = RowTreeDebug::new().format(&store());
        assert!(dump.contains("(empty)"));
    }
}
