//! Flattening the row tree into display order.
//!
//! A depth-first pre-order walk over `children_after_sort`: every visible
//! node gets the next display index and its pixel offset in the same pass.
//! Children of collapsed groups are skipped. Display indices are always
//! `0..len` without gaps; any expand, collapse or height change re-flattens.

use horizon_grid_core::PerfSpan;
use horizon_grid_core::logging::{span_names, targets};

use super::context::GridContext;
use super::grouping::FOOTER_ID_PREFIX;
use super::node::{NodeKind, NodeStore, RowKey, RowNode};

/// Pixel geometry of a displayed row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBounds {
    /// Offset of the row's top edge.
    pub top: f64,
    /// Row height.
    pub height: f64,
}

/// The displayed rows in order, with their geometry.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    rows: Vec<RowKey>,
    tops: Vec<f64>,
    heights: Vec<f64>,
}

impl DisplayList {
    /// Number of displayed rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Key of the row at a display index.
    pub fn key_at(&self, index: usize) -> Option<RowKey> {
        self.rows.get(index).copied()
    }

    /// Displayed keys in order.
    pub fn keys(&self) -> &[RowKey] {
        &self.rows
    }

    /// Geometry of the row at a display index.
    pub fn bounds(&self, index: usize) -> Option<RowBounds> {
        Some(RowBounds {
            top: *self.tops.get(index)?,
            height: *self.heights.get(index)?,
        })
    }

    /// Sum of all row heights.
    pub fn total_height(&self) -> f64 {
        match (self.tops.last(), self.heights.last()) {
            (Some(top), Some(height)) => top + height,
            _ => 0.0,
        }
    }

    /// Display index of the row covering `pixel`. Pixels above the first
    /// row map to row 0, pixels below the last row to the last row.
    pub fn index_at_pixel(&self, pixel: f64) -> Option<usize> {
        if self.rows.is_empty() {
            return None;
        }
        let after = self.tops.partition_point(|&top| top <= pixel);
        Some(after.saturating_sub(1).min(self.rows.len() - 1))
    }

    fn push(&mut self, key: RowKey, height: f64) -> (usize, f64) {
        let top = self.total_height();
        self.rows.push(key);
        self.tops.push(top);
        self.heights.push(height);
        (self.rows.len() - 1, top)
    }
}

/// Assigns display indices and row geometry.
pub struct FlattenStage<'a> {
    ctx: &'a GridContext,
}

impl<'a> FlattenStage<'a> {
    /// Creates the stage.
    pub fn new(ctx: &'a GridContext) -> Self {
        Self { ctx }
    }

    /// Rebuilds `display` from the tree.
    pub fn execute(&self, store: &mut NodeStore, display: &mut DisplayList) {
        let _perf = PerfSpan::new(span_names::FLATTEN);

        for &key in &display.rows {
            if let Some(node) = store.get_mut(key) {
                node.row_index = None;
                node.row_top = None;
            }
        }

        let mut next = DisplayList::default();
        let root = store.root();
        self.add_children(store, root, &mut next);

        let settings = &self.ctx.options.settings;
        let has_rows = store
            .get(root)
            .is_some_and(|r| !r.children_after_sort().is_empty());
        if settings.group_include_total_footer
            && has_rows
            && let Some(footer) = self.ensure_footer(store, root)
        {
            self.emit(store, footer, &mut next);
        }

        tracing::debug!(
            target: targets::FLATTEN,
            rows = next.len(),
            height = next.total_height(),
            "flatten complete"
        );
        *display = next;
    }

    fn add_children(&self, store: &mut NodeStore, parent: RowKey, out: &mut DisplayList) {
        let settings = &self.ctx.options.settings;
        let pivot_mode = self.ctx.options.settings.pivot_mode;
        let children = store
            .get(parent)
            .map(|p| p.children_after_sort().to_vec())
            .unwrap_or_default();

        for child in children {
            let Some(node) = store.get(child) else {
                continue;
            };
            let is_parent = node.is_group();
            if pivot_mode && !is_parent {
                continue;
            }
            if is_parent
                && settings.group_remove_single_children
                && node.kind() == NodeKind::Group
                && node.children_after_sort().len() == 1
            {
                self.add_children(store, child, out);
                continue;
            }
            let expanded = node.is_expanded();
            let is_group_row = node.kind() == NodeKind::Group;

            self.emit(store, child, out);
            if is_parent && expanded {
                self.add_children(store, child, out);
                if settings.group_include_footer
                    && is_group_row
                    && let Some(footer) = self.ensure_footer(store, child)
                {
                    self.emit(store, footer, out);
                }
            }
        }
    }

    fn emit(&self, store: &mut NodeStore, key: RowKey, out: &mut DisplayList) {
        let Some(node) = store.get(key) else {
            return;
        };
        let height = node
            .manual_height
            .or_else(|| self.ctx.options.row_height_fn().and_then(|f| f(node)))
            .unwrap_or(self.ctx.options.settings.row_height);
        let (index, top) = out.push(key, height);
        if let Some(node) = store.get_mut(key) {
            node.row_index = Some(index);
            node.row_top = Some(top);
            node.row_height = Some(height);
        }
    }

    /// Returns the footer row of `group`, creating it on first use. The
    /// footer mirrors the group's current aggregates.
    fn ensure_footer(&self, store: &mut NodeStore, group: RowKey) -> Option<RowKey> {
        let node = store.get(group)?;
        let agg_data = node.agg_data().cloned();
        let footer = match node.footer() {
            Some(footer) => footer,
            None => {
                let id = format!("{FOOTER_ID_PREFIX}{}", node.id());
                let mut footer = RowNode::new(id, NodeKind::Footer);
                footer.level = node.level();
                footer.parent = Some(group);
                footer.group_key = node.group_key().cloned();
                footer.group_column = node.group_column().map(str::to_string);
                let key = store.insert(footer).ok()?;
                if let Some(group_node) = store.get_mut(group) {
                    group_node.footer = Some(key);
                }
                key
            }
        };
        if let Some(footer_node) = store.get_mut(footer) {
            footer_node.agg_data = agg_data;
        }
        Some(footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(heights: &[f64]) -> DisplayList {
        let mut list = DisplayList::default();
        let mut store = NodeStore::new();
        for (i, &h) in heights.iter().enumerate() {
            let key = store.insert(RowNode::new(i.to_string(), NodeKind::Leaf)).unwrap();
            list.push(key, h);
        }
        list
    }

    #[test]
    fn test_bounds_accumulate() {
        let list = display(&[10.0, 20.0, 30.0]);
        assert_eq!(list.bounds(1), Some(RowBounds { top: 10.0, height: 20.0 }));
        assert_eq!(list.bounds(2), Some(RowBounds { top: 30.0, height: 30.0 }));
        assert_eq!(list.bounds(3), None);
        assert_eq!(list.total_height(), 60.0);
    }

    #[test]
    fn test_index_at_pixel() {
        let list = display(&[10.0, 20.0, 30.0]);
        assert_eq!(list.index_at_pixel(-5.0), Some(0));
        assert_eq!(list.index_at_pixel(0.0), Some(0));
        assert_eq!(list.index_at_pixel(9.9), Some(0));
        assert_eq!(list.index_at_pixel(10.0), Some(1));
        assert_eq!(list.index_at_pixel(45.0), Some(2));
        assert_eq!(list.index_at_pixel(1000.0), Some(2));
        assert_eq!(DisplayList::default().index_at_pixel(0.0), None);
    }
}
