//! Point-tile rendering.
//!
//! Streams measurements, bins each by tile coordinate at a fixed zoom, and
//! draws a colored dot into the tile's cached canvas. Points are processed
//! in arrival order; overlapping dots resolve last-arrived-wins, so a rerun
//! over the same ordered input converges to identical output.

use projection::{deg_to_pixel, deg_to_tile, ProjectionError};
use storage::{CacheStats, FailedTile, TileBufferCache};
use tile_common::{BoundingBox, ColorLegend, Measurement, TileCoord};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Settings for one point-rendering pass.
#[derive(Debug, Clone)]
pub struct PointRendererConfig {
    pub zoom: u32,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Dot radius in pixels.
    pub dot_radius: u32,
    /// Divisor converting raw values to dose rates before classification
    /// (1.0 when values are already µSv/h).
    pub calibration: f64,
}

impl Default for PointRendererConfig {
    fn default() -> Self {
        Self {
            zoom: 13,
            tile_size: 256,
            dot_radius: 2,
            calibration: 1.0,
        }
    }
}

/// Outcome of a completed rendering pass.
#[derive(Debug)]
pub struct RenderReport {
    pub points_drawn: u64,
    /// Points outside the projection's latitude band.
    pub points_skipped: u64,
    /// Extent of the drawn points; `None` when nothing was drawn.
    pub bounds: Option<BoundingBox>,
    /// Tiles whose persistence failed during eviction or flush.
    pub failed: Vec<FailedTile>,
    pub cache: CacheStats,
}

/// Streaming dot renderer over a disk-spilling tile cache.
///
/// Single-threaded over arrival order. Parallelizing would require routing
/// all points for one tile to the same worker to keep intra-tile ordering.
pub struct PointRenderer {
    cache: TileBufferCache,
    legend: ColorLegend,
    config: PointRendererConfig,
    drawn: u64,
    skipped: u64,
    bounds: Option<BoundingBox>,
}

impl PointRenderer {
    pub fn new(cache: TileBufferCache, legend: ColorLegend, config: PointRendererConfig) -> Self {
        Self {
            cache,
            legend,
            config,
            drawn: 0,
            skipped: 0,
            bounds: None,
        }
    }

    /// Draw one measurement into its tile.
    ///
    /// Points outside the projectable latitude band are counted and skipped
    /// rather than failing the stream. A configured zoom the projection does
    /// not support is an error, as are cache errors (a persisted tile that
    /// no longer decodes); continuing past either would silently drop
    /// output.
    pub fn render(&mut self, m: &Measurement) -> Result<()> {
        let (x, y) = match deg_to_tile(m.lat, m.lon, self.config.zoom) {
            Ok(xy) => xy,
            Err(e @ ProjectionError::ZoomOutOfRange(_)) => return Err(e.into()),
            Err(e) => {
                warn!(lat = m.lat, lon = m.lon, error = %e, "skipping unprojectable point");
                self.skipped += 1;
                return Ok(());
            }
        };
        let coord = TileCoord::new(self.config.zoom, x, y);
        let (px, py) = deg_to_pixel(m.lat, m.lon, x, y, self.config.zoom, self.config.tile_size)?;

        let color = self.legend.classify(m.value / self.config.calibration);
        let buffer = self.cache.get_or_create(coord)?;
        buffer.draw_dot(px, py, self.config.dot_radius, color);

        self.drawn += 1;
        self.extend_bounds(m.lon, m.lat);
        Ok(())
    }

    /// Render an entire ordered batch.
    pub fn render_all<'a, I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        for m in points {
            self.render(m)?;
        }
        Ok(())
    }

    /// Flush every resident buffer to disk and report the pass.
    pub fn finish(mut self) -> RenderReport {
        self.cache.flush();
        let stats = self.cache.stats();
        let failed = self.cache.take_failed_tiles();
        info!(
            drawn = self.drawn,
            skipped = self.skipped,
            evictions = stats.evictions,
            reloads = stats.reloads,
            failed = failed.len(),
            "point rendering complete"
        );
        RenderReport {
            points_drawn: self.drawn,
            points_skipped: self.skipped,
            bounds: self.bounds,
            failed,
            cache: stats,
        }
    }

    fn extend_bounds(&mut self, lon: f64, lat: f64) {
        match &mut self.bounds {
            Some(b) => {
                b.min_lon = b.min_lon.min(lon);
                b.max_lon = b.max_lon.max(lon);
                b.min_lat = b.min_lat.min(lat);
                b.max_lat = b.max_lat.max(lat);
            }
            None => {
                debug!(lon, lat, "first point drawn");
                self.bounds = Some(BoundingBox::new(lon, lat, lon, lat));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::TileLayout;

    fn renderer(dir: &std::path::Path, budget_tiles: u64) -> PointRenderer {
        let tile_bytes = 256u64 * 256 * 4;
        let cache = TileBufferCache::new(TileLayout::new(dir), 256, budget_tiles * tile_bytes)
            .expect("valid budget");
        PointRenderer::new(
            cache,
            ColorLegend::safecast(),
            PointRendererConfig {
                zoom: 10,
                tile_size: 256,
                dot_radius: 2,
                calibration: 350.0,
            },
        )
    }

    #[test]
    fn test_polar_point_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = renderer(dir.path(), 4);

        r.render(&Measurement::new(89.0, 10.0, 100.0)).expect("render");
        r.render(&Measurement::new(35.0, 139.0, 100.0)).expect("render");

        let report = r.finish();
        assert_eq!(report.points_skipped, 1);
        assert_eq!(report.points_drawn, 1);
    }

    #[test]
    fn test_unsupported_zoom_is_error_not_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tile_bytes = 256u64 * 256 * 4;
        let cache = TileBufferCache::new(TileLayout::new(dir.path()), 256, 4 * tile_bytes)
            .expect("valid budget");
        let mut r = PointRenderer::new(
            cache,
            ColorLegend::safecast(),
            PointRendererConfig {
                zoom: 32,
                ..PointRendererConfig::default()
            },
        );

        let result = r.render(&Measurement::new(35.0, 139.0, 100.0));
        assert!(matches!(
            result,
            Err(crate::RenderError::Projection(ProjectionError::ZoomOutOfRange(32)))
        ));
    }

    #[test]
    fn test_bounds_track_drawn_points_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut r = renderer(dir.path(), 4);

        r.render(&Measurement::new(35.0, 139.0, 100.0)).expect("render");
        r.render(&Measurement::new(36.0, 140.0, 100.0)).expect("render");
        r.render(&Measurement::new(89.0, 0.0, 100.0)).expect("render"); // skipped

        let bounds = r.finish().bounds.expect("bounds");
        assert_eq!(bounds.min_lon, 139.0);
        assert_eq!(bounds.max_lon, 140.0);
        assert_eq!(bounds.min_lat, 35.0);
        assert_eq!(bounds.max_lat, 36.0);
    }

    #[test]
    fn test_empty_stream_reports_no_bounds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = renderer(dir.path(), 4).finish();
        assert_eq!(report.points_drawn, 0);
        assert!(report.bounds.is_none());
        assert!(report.failed.is_empty());
    }
}
