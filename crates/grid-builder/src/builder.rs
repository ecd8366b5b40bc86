//! Chunked inverse-distance-weighted grid computation.

use rayon::prelude::*;
use tile_common::{BoundingBox, Measurement};
use tracing::{debug, info};

use crate::error::{GridBuilderError, Result};
use crate::grid::InterpolatedGrid;
use crate::index::{Neighbor, SpatialIndex};

/// Configuration for a grid build.
#[derive(Debug, Clone)]
pub struct GridBuilderConfig {
    /// Number of grid rows (latitude cells).
    pub rows: usize,
    /// Number of grid columns (longitude cells).
    pub cols: usize,
    /// Explicit geographic bounds; when absent the point cloud's extent is
    /// used (with a degenerate-axis nudge).
    pub bbox: Option<BoundingBox>,
    /// IDW power `p` in `1 / d^p`.
    pub power: f64,
    /// Neighbor search radius in degrees.
    pub radius: f64,
    /// Rows per parallel chunk.
    pub chunk_rows: usize,
}

impl Default for GridBuilderConfig {
    fn default() -> Self {
        Self {
            rows: 512,
            cols: 512,
            bbox: None,
            power: 2.0,
            radius: 0.05,
            chunk_rows: 64,
        }
    }
}

/// Builds a dense [`InterpolatedGrid`] from a point cloud.
pub struct GridBuilder {
    config: GridBuilderConfig,
}

impl GridBuilder {
    pub fn new(config: GridBuilderConfig) -> Result<Self> {
        if config.rows == 0 || config.cols == 0 {
            return Err(GridBuilderError::InvalidShape {
                rows: config.rows,
                cols: config.cols,
            });
        }
        if !config.radius.is_finite() || config.radius <= 0.0 {
            return Err(GridBuilderError::InvalidRadius(config.radius));
        }
        Ok(Self { config })
    }

    /// Interpolate the point cloud onto the configured grid.
    ///
    /// An empty point cloud still yields a grid (fully nodata), so a run with
    /// zero surviving measurements terminates normally with transparent tiles
    /// downstream.
    pub fn build(&self, points: Vec<Measurement>) -> InterpolatedGrid {
        let cfg = &self.config;
        let index = SpatialIndex::build(points, cfg.radius);

        let bbox = cfg
            .bbox
            .map(BoundingBox::nudge_degenerate)
            .unwrap_or_else(|| index.bounding_box());

        info!(
            points = index.len(),
            rows = cfg.rows,
            cols = cfg.cols,
            radius = cfg.radius,
            power = cfg.power,
            "interpolating point cloud onto grid"
        );

        let lon_step = bbox.width() / cfg.cols as f64;
        let lat_step = bbox.height() / cfg.rows as f64;

        let mut values = vec![f32::NAN; cfg.rows * cfg.cols];
        let band_len = cfg.chunk_rows.max(1) * cfg.cols;

        // Each band is a disjoint sub-block of output rows; writes never
        // overlap, so no synchronization is needed beyond the fork/join.
        values
            .par_chunks_mut(band_len)
            .enumerate()
            .for_each(|(band_idx, band)| {
                let first_row = band_idx * cfg.chunk_rows.max(1);
                let mut scratch: Vec<Neighbor> = Vec::new();
                for (offset, cell) in band.iter_mut().enumerate() {
                    let row = first_row + offset / cfg.cols;
                    let col = offset % cfg.cols;
                    // Row 0 sits at the northern edge.
                    let lat = bbox.max_lat - (row as f64 + 0.5) * lat_step;
                    let lon = bbox.min_lon + (col as f64 + 0.5) * lon_step;
                    *cell = idw_estimate(&index, lon, lat, cfg.radius, cfg.power, &mut scratch);
                }
                debug!(band = band_idx, rows = band.len() / cfg.cols, "grid chunk complete");
            });

        let grid = InterpolatedGrid::from_parts(values, cfg.rows, cfg.cols, bbox);
        info!(coverage_pct = grid.coverage() * 100.0, "grid build complete");
        grid
    }
}

/// IDW estimate at one location, NaN when no neighbor lies within the radius.
fn idw_estimate(
    index: &SpatialIndex,
    lon: f64,
    lat: f64,
    radius: f64,
    power: f64,
    scratch: &mut Vec<Neighbor>,
) -> f32 {
    index.within_radius(lon, lat, radius, scratch);
    if scratch.is_empty() {
        return f32::NAN;
    }

    // A sample exactly at the cell center is returned verbatim; weighting
    // would divide by zero.
    if let Some(exact) = scratch.iter().find(|n| n.distance == 0.0) {
        return exact.value as f32;
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for n in scratch.iter() {
        let weight = 1.0 / n.distance.powf(power);
        numerator += n.value * weight;
        denominator += weight;
    }
    (numerator / denominator) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(rows: usize, cols: usize, radius: f64) -> GridBuilder {
        GridBuilder::new(GridBuilderConfig {
            rows,
            cols,
            radius,
            ..Default::default()
        })
        .expect("valid config")
    }

    #[test]
    fn test_rejects_zero_shape() {
        let cfg = GridBuilderConfig {
            rows: 0,
            ..Default::default()
        };
        assert!(matches!(
            GridBuilder::new(cfg),
            Err(GridBuilderError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_radius() {
        let cfg = GridBuilderConfig {
            radius: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            GridBuilder::new(cfg),
            Err(GridBuilderError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_empty_point_cloud_yields_nodata_grid() {
        let grid = builder(8, 8, 0.05).build(Vec::new());
        assert_eq!(grid.shape(), (8, 8));
        assert!(grid.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_exact_point_value_preserved() {
        // A 1x1 grid over a degenerate bbox centered on the data point: the
        // single cell center coincides with the sample, so IDW must return
        // the sample's value exactly even with another point in range.
        let cfg = GridBuilderConfig {
            rows: 1,
            cols: 1,
            bbox: Some(BoundingBox::new(138.995, 34.995, 139.005, 35.005)),
            radius: 0.5,
            ..Default::default()
        };
        let grid = GridBuilder::new(cfg).expect("valid").build(vec![
            Measurement::new(35.0, 139.0, 777.0),
            Measurement::new(35.002, 139.002, 1.0),
        ]);
        assert_eq!(grid.get(0, 0), Some(777.0));
    }

    #[test]
    fn test_cells_beyond_radius_are_nodata() {
        let cfg = GridBuilderConfig {
            rows: 2,
            cols: 2,
            bbox: Some(BoundingBox::new(139.0, 35.0, 141.0, 37.0)),
            radius: 0.05,
            ..Default::default()
        };
        // One point near the south-west cell center only.
        let grid = GridBuilder::new(cfg)
            .expect("valid")
            .build(vec![Measurement::new(35.5, 139.5, 100.0)]);
        assert_eq!(grid.get(1, 0), Some(100.0));
        assert!(grid.get(0, 1).is_some_and(f32::is_nan));
    }

    #[test]
    fn test_idw_weights_follow_distance() {
        // Cell center between two samples, nearer one dominates.
        let cfg = GridBuilderConfig {
            rows: 1,
            cols: 1,
            bbox: Some(BoundingBox::new(139.0, 35.0, 139.1, 35.1)),
            radius: 1.0,
            power: 2.0,
            ..Default::default()
        };
        // Cell center is (139.05, 35.05).
        let grid = GridBuilder::new(cfg).expect("valid").build(vec![
            Measurement::new(35.05, 139.06, 10.0),
            Measurement::new(35.05, 139.55, 1000.0),
        ]);
        let v = grid.get(0, 0).expect("in bounds");
        assert!(v > 10.0 && v < 100.0, "estimate {v} should stay near the close sample");
    }
}
