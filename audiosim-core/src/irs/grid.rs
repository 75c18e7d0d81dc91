use crate::irs::ListenerIndex;
use std::ops::Index;

/// Square grid of a source's listeners.
///
/// Rows run along X and columns along Y: `(row, col)` holds the listener with the
/// `row`-th smallest x and `col`-th smallest y. Storage is contiguous and row-major,
/// so a row is a slice ordered by ascending y.
#[derive(Debug, Clone, Default)]
pub struct ListenerGrid {
    axis: usize,
    cells: Vec<ListenerIndex>,
}

impl ListenerGrid {
    /// `cells` must already be sorted by ascending x, then ascending y.
    pub(crate) fn new(axis: usize, cells: Vec<ListenerIndex>) -> Self {
        debug_assert_eq!(axis * axis, cells.len());
        Self { axis, cells }
    }

    /// Number of listeners along each side.
    pub fn axis_size(&self) -> usize {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<ListenerIndex> {
        if row < self.axis && col < self.axis {
            Some(self.cells[row * self.axis + col])
        } else {
            None
        }
    }

    /// Listeners sharing the `row`-th x coordinate, by ascending y.
    pub fn row(&self, row: usize) -> &[ListenerIndex] {
        &self.cells[row * self.axis..(row + 1) * self.axis]
    }

    /// Listeners sharing the `col`-th y coordinate, by ascending x.
    pub fn column(&self, col: usize) -> impl Iterator<Item = ListenerIndex> + '_ {
        self.cells.iter().skip(col).step_by(self.axis.max(1)).copied()
    }

    /// All listeners in grid order.
    pub fn iter(&self) -> impl Iterator<Item = ListenerIndex> + '_ {
        self.cells.iter().copied()
    }
}

impl Index<(usize, usize)> for ListenerGrid {
    type Output = ListenerIndex;

    fn index(&self, (row, col): (usize, usize)) -> &ListenerIndex {
        assert!(
            row < self.axis && col < self.axis,
            "grid index ({}, {}) out of range for axis {}",
            row,
            col,
            self.axis
        );
        &self.cells[row * self.axis + col]
    }
}
