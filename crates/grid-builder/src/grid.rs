//! Dense interpolated grid.

use tile_common::BoundingBox;

/// A dense scalar grid with NaN as the nodata sentinel.
///
/// Values are stored row-major with row 0 at the grid's northern edge
/// (descending latitude), matching raster orientation. Created once by the
/// builder and read-only afterward.
#[derive(Debug, Clone)]
pub struct InterpolatedGrid {
    values: Vec<f32>,
    rows: usize,
    cols: usize,
    bbox: BoundingBox,
}

impl InterpolatedGrid {
    /// Assemble a grid from parts. Callers guarantee `values.len() == rows * cols`.
    pub(crate) fn from_parts(
        values: Vec<f32>,
        rows: usize,
        cols: usize,
        bbox: BoundingBox,
    ) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self {
            values,
            rows,
            cols,
            bbox,
        }
    }

    /// Grid shape as (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The realized geographic bounds of the grid.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Value at (row, col), or `None` outside the grid. NaN means nodata.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.values[row * self.cols + col])
    }

    /// Raw row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Fraction of cells holding an estimate (for logging).
    pub fn coverage(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let filled = self.values.iter().filter(|v| !v.is_nan()).count();
        filled as f64 / self.values.len() as f64
    }
}
