//! Static spatial index over a point cloud.
//!
//! A uniform bucket grid in lon/lat degree space: each point lands in one
//! cell, and a radius query scans only the cells overlapping the query disc.
//! Distances are Euclidean in degrees to match the interpolation radius,
//! which is also specified in degrees.

use tile_common::{BoundingBox, Measurement};

/// A point returned by a radius query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Euclidean distance in degrees from the query location.
    pub distance: f64,
    /// The point's measurement value.
    pub value: f64,
}

/// Immutable bucket-grid index supporting radius queries.
pub struct SpatialIndex {
    points: Vec<Measurement>,
    bbox: BoundingBox,
    cell_size: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<u32>>,
}

impl SpatialIndex {
    /// Build an index over a point cloud.
    ///
    /// `cell_size` should be on the order of the query radius; queries remain
    /// correct for any positive value, only the number of scanned buckets
    /// changes.
    pub fn build(points: Vec<Measurement>, cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };

        let bbox = BoundingBox::from_points(points.iter().map(|m| (m.lon, m.lat)))
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));

        let cols = ((bbox.width() / cell_size).ceil() as usize).max(1);
        let rows = ((bbox.height() / cell_size).ceil() as usize).max(1);
        let mut buckets = vec![Vec::new(); cols * rows];

        for (i, m) in points.iter().enumerate() {
            let (col, row) = cell_of(&bbox, cell_size, cols, rows, m.lon, m.lat);
            buckets[row * cols + col].push(i as u32);
        }

        Self {
            points,
            bbox,
            cell_size,
            cols,
            rows,
            buckets,
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extent of the indexed point cloud (epsilon-nudged on degenerate axes).
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Collect all points within `radius` degrees of a location.
    ///
    /// Results are appended to `out`, which is cleared first; the caller can
    /// reuse the buffer across queries to avoid reallocating.
    pub fn within_radius(&self, lon: f64, lat: f64, radius: f64, out: &mut Vec<Neighbor>) {
        out.clear();
        if self.points.is_empty() {
            return;
        }

        let span = (radius / self.cell_size).ceil() as i64;
        let (center_col, center_row) =
            cell_of(&self.bbox, self.cell_size, self.cols, self.rows, lon, lat);

        let col_lo = (center_col as i64 - span).max(0) as usize;
        let col_hi = ((center_col as i64 + span) as usize).min(self.cols - 1);
        let row_lo = (center_row as i64 - span).max(0) as usize;
        let row_hi = ((center_row as i64 + span) as usize).min(self.rows - 1);

        let r2 = radius * radius;
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                for &idx in &self.buckets[row * self.cols + col] {
                    let p = &self.points[idx as usize];
                    let dx = p.lon - lon;
                    let dy = p.lat - lat;
                    let d2 = dx * dx + dy * dy;
                    if d2 <= r2 {
                        out.push(Neighbor {
                            distance: d2.sqrt(),
                            value: p.value,
                        });
                    }
                }
            }
        }
    }
}

fn cell_of(
    bbox: &BoundingBox,
    cell_size: f64,
    cols: usize,
    rows: usize,
    lon: f64,
    lat: f64,
) -> (usize, usize) {
    let col = ((lon - bbox.min_lon) / cell_size).floor();
    let row = ((lat - bbox.min_lat) / cell_size).floor();
    (
        (col as i64).clamp(0, cols as i64 - 1) as usize,
        (row as i64).clamp(0, rows as i64 - 1) as usize,
    )
}
