//! The interface a virtualized view renders from.

use super::flatten::RowBounds;
use super::node::RowNode;
use super::signals::RowModelSignals;

/// A row model as seen by a viewport renderer.
///
/// The renderer only ever asks for displayed rows by index or by pixel
/// offset and listens to [`RowModelSignals::model_updated`] to learn when
/// the display changed.
pub trait RowModel: Send + Sync {
    /// Number of displayed rows.
    fn displayed_row_count(&self) -> usize;

    /// The row at a display index, `None` past the end.
    fn displayed_row_at_index(&self, index: usize) -> Option<&RowNode>;

    /// The display index covering a pixel offset, clamped to the first and
    /// last rows. `None` when nothing is displayed.
    fn row_index_at_pixel(&self, pixel: f64) -> Option<usize>;

    /// Geometry of the row at a display index.
    fn row_bounds(&self, index: usize) -> Option<RowBounds>;

    /// Signals for this model.
    fn signals(&self) -> &RowModelSignals;

    // -------------------------------------------------------------------------
    // Optional methods with default implementations
    // -------------------------------------------------------------------------

    /// Combined height of every displayed row.
    fn total_height(&self) -> f64 {
        self.displayed_row_count()
            .checked_sub(1)
            .and_then(|last| self.row_bounds(last))
            .map_or(0.0, |b| b.top + b.height)
    }

    /// Returns `true` when nothing is displayed.
    fn is_empty(&self) -> bool {
        self.displayed_row_count() == 0
    }

    /// Display indices of the rows intersecting `top..bottom`.
    fn rows_in_viewport(&self, top: f64, bottom: f64) -> std::ops::Range<usize> {
        match (self.row_index_at_pixel(top), self.row_index_at_pixel(bottom)) {
            (Some(first), Some(last)) if bottom >= top => first..last + 1,
            _ => 0..0,
        }
    }
}
