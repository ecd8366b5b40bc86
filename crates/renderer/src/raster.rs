//! Grid-to-tile rasterization.
//!
//! Slices a dense scalar field into Web Mercator tiles at a zoom level:
//! each tile maps its geographic footprint onto a clamped sub-rectangle of
//! the source grid, classifies the cells through the color legend (NaN is
//! transparent), and nearest-neighbor resamples the slice to the tile size.
//! Tiles share only read-only inputs, so they render in parallel.

use rayon::prelude::*;
use std::fs;

use crate::error::Result;
use grid_builder::InterpolatedGrid;
use projection::{tile_range, tile_to_deg};
use storage::{png, FailedTile, TileLayout};
use tile_common::{BoundingBox, ColorLegend, TileCoord};
use tracing::{info, warn};

/// A dense scalar field sliceable into tiles.
///
/// Abstracts over the artifact formats that feed the rasterizer; adapters
/// only need bounds, shape, and per-cell access with NaN as nodata.
pub trait GridField {
    fn bounding_box(&self) -> BoundingBox;
    /// (rows, cols); row 0 at the northern edge.
    fn shape(&self) -> (usize, usize);
    fn get(&self, row: usize, col: usize) -> Option<f32>;
}

impl GridField for InterpolatedGrid {
    fn bounding_box(&self) -> BoundingBox {
        InterpolatedGrid::bounding_box(self)
    }

    fn shape(&self) -> (usize, usize) {
        InterpolatedGrid::shape(self)
    }

    fn get(&self, row: usize, col: usize) -> Option<f32> {
        InterpolatedGrid::get(self, row, col)
    }
}

/// Options for a rasterization pass.
#[derive(Debug, Clone)]
pub struct RasterizeOptions {
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Divisor converting stored values to dose rates before classification
    /// (1.0 when the grid already holds µSv/h).
    pub calibration: f64,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            calibration: 1.0,
        }
    }
}

/// Outcome of rasterizing one zoom level.
#[derive(Debug)]
pub struct RasterSummary {
    pub zoom: u32,
    pub tiles_written: usize,
    /// Tiles in range whose footprint missed the grid entirely.
    pub transparent_tiles: usize,
    /// Tiles whose write failed; the run continues past them.
    pub failed: Vec<FailedTile>,
}

/// Rasterize every tile covering the field's bounding box at one zoom.
///
/// A zoom past the projection's supported maximum is an error; individual
/// tile write failures are collected in the summary instead.
pub fn rasterize_zoom<F>(
    field: &F,
    legend: &ColorLegend,
    layout: &TileLayout,
    zoom: u32,
    opts: &RasterizeOptions,
) -> Result<RasterSummary>
where
    F: GridField + Sync,
{
    let bbox = field.bounding_box();
    let (xs, ys) = tile_range(&bbox, zoom)?;

    let coords: Vec<TileCoord> = xs
        .flat_map(|x| ys.clone().map(move |y| TileCoord::new(zoom, x, y)))
        .collect();
    info!(zoom, tiles = coords.len(), "rasterizing grid");

    let results: Vec<(TileCoord, bool, Option<String>)> = coords
        .par_iter()
        .map(|&coord| {
            let (pixels, has_data) = render_tile(field, legend, coord, opts);
            match write_tile(layout, coord, &pixels, opts.tile_size) {
                Ok(()) => (coord, has_data, None),
                Err(e) => (coord, has_data, Some(e.to_string())),
            }
        })
        .collect();

    let mut summary = RasterSummary {
        zoom,
        tiles_written: 0,
        transparent_tiles: 0,
        failed: Vec::new(),
    };
    for (coord, has_data, error) in results {
        match error {
            Some(error) => {
                warn!(tile = %coord, %error, "failed to write tile");
                summary.failed.push(FailedTile { coord, error });
            }
            None => {
                summary.tiles_written += 1;
                if !has_data {
                    summary.transparent_tiles += 1;
                }
            }
        }
    }
    info!(
        zoom,
        written = summary.tiles_written,
        transparent = summary.transparent_tiles,
        failed = summary.failed.len(),
        "rasterization complete"
    );
    Ok(summary)
}

fn write_tile(
    layout: &TileLayout,
    coord: TileCoord,
    pixels: &[u8],
    tile_size: u32,
) -> storage::Result<()> {
    let path = layout.tile_path(&coord);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let encoded = png::encode_rgba(pixels, tile_size as usize, tile_size as usize)?;
    fs::write(path, encoded)?;
    Ok(())
}

/// Render one tile to RGBA pixels. The second return value is false when the
/// tile came out fully transparent.
fn render_tile<F: GridField>(
    field: &F,
    legend: &ColorLegend,
    coord: TileCoord,
    opts: &RasterizeOptions,
) -> (Vec<u8>, bool) {
    let tile_size = opts.tile_size as usize;
    let mut pixels = vec![0u8; tile_size * tile_size * 4];

    let bbox = field.bounding_box();
    let (rows, cols) = field.shape();
    if rows == 0 || cols == 0 {
        return (pixels, false);
    }
    let lon_res = bbox.width() / cols as f64;
    let lat_res = bbox.height() / rows as f64;

    // Tile footprint corners in grid pixel space.
    let (nw_lat, nw_lon) = tile_to_deg(coord.x, coord.y, coord.z);
    let (se_lat, se_lon) = tile_to_deg(coord.x + 1, coord.y + 1, coord.z);

    let x_start = ((nw_lon - bbox.min_lon) / lon_res).floor() as i64;
    let y_start = ((bbox.max_lat - nw_lat) / lat_res).floor() as i64;
    let x_end = ((se_lon - bbox.min_lon) / lon_res).ceil() as i64;
    let y_end = ((bbox.max_lat - se_lat) / lat_res).ceil() as i64;

    // Clamp to the grid; an empty window leaves the tile transparent.
    let cx_start = x_start.max(0) as usize;
    let cy_start = y_start.max(0) as usize;
    let cx_end = (x_end.min(cols as i64)).max(0) as usize;
    let cy_end = (y_end.min(rows as i64)).max(0) as usize;
    if cx_start >= cx_end || cy_start >= cy_end {
        return (pixels, false);
    }

    let slice_w = cx_end - cx_start;
    let slice_h = cy_end - cy_start;

    // Nearest-neighbor resample the slice onto the full tile canvas.
    let mut has_data = false;
    for ty in 0..tile_size {
        let src_row = cy_start + (ty * slice_h) / tile_size;
        for tx in 0..tile_size {
            let src_col = cx_start + (tx * slice_w) / tile_size;
            let value = match field.get(src_row, src_col) {
                Some(v) if !v.is_nan() => v,
                _ => continue, // nodata stays transparent
            };
            let color = legend.classify(value as f64 / opts.calibration);
            let idx = (ty * tile_size + tx) * 4;
            pixels[idx] = color.r;
            pixels[idx + 1] = color.g;
            pixels[idx + 2] = color.b;
            pixels[idx + 3] = 255;
            has_data = true;
        }
    }

    (pixels, has_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::deg_to_tile;

    /// Minimal in-memory field for exercising the rasterizer directly.
    struct DenseField {
        values: Vec<f32>,
        rows: usize,
        cols: usize,
        bbox: BoundingBox,
    }

    impl GridField for DenseField {
        fn bounding_box(&self) -> BoundingBox {
            self.bbox
        }

        fn shape(&self) -> (usize, usize) {
            (self.rows, self.cols)
        }

        fn get(&self, row: usize, col: usize) -> Option<f32> {
            if row >= self.rows || col >= self.cols {
                return None;
            }
            Some(self.values[row * self.cols + col])
        }
    }

    fn uniform_field(value: f32) -> DenseField {
        DenseField {
            values: vec![value; 64 * 64],
            rows: 64,
            cols: 64,
            bbox: BoundingBox::new(139.0, 35.0, 139.5, 35.4),
        }
    }

    #[test]
    fn test_uniform_grid_fills_covering_tile() {
        let field = uniform_field(0.2);
        let legend = ColorLegend::safecast();
        let (x, y) = deg_to_tile(35.2, 139.2, 10).expect("valid");
        let opts = RasterizeOptions::default();

        let (pixels, has_data) =
            render_tile(&field, &legend, TileCoord::new(10, x, y), &opts);
        assert!(has_data);
        // 0.2 µSv/h classifies as cyan (0.25 bucket).
        let expected = legend.classify(0.2);
        let center = ((128 * 256 + 128) * 4) as usize;
        assert_eq!(
            &pixels[center..center + 4],
            &[expected.r, expected.g, expected.b, 255]
        );
    }

    #[test]
    fn test_nodata_grid_is_transparent() {
        let field = uniform_field(f32::NAN);
        let legend = ColorLegend::safecast();
        let (x, y) = deg_to_tile(35.2, 139.2, 10).expect("valid");

        let (pixels, has_data) = render_tile(
            &field,
            &legend,
            TileCoord::new(10, x, y),
            &RasterizeOptions::default(),
        );
        assert!(!has_data);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tile_outside_grid_is_transparent() {
        let field = uniform_field(1.0);
        let legend = ColorLegend::safecast();
        // A tile on the other side of the world.
        let (x, y) = deg_to_tile(-10.0, -60.0, 10).expect("valid");

        let (pixels, has_data) = render_tile(
            &field,
            &legend,
            TileCoord::new(10, x, y),
            &RasterizeOptions::default(),
        );
        assert!(!has_data);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_calibration_divides_before_classify() {
        let field = uniform_field(6000.0); // raw cpm
        let legend = ColorLegend::safecast();
        let (x, y) = deg_to_tile(35.2, 139.2, 10).expect("valid");
        let opts = RasterizeOptions {
            tile_size: 256,
            calibration: 350.0,
        };

        let (pixels, _) = render_tile(&field, &legend, TileCoord::new(10, x, y), &opts);
        // 6000 / 350 ≈ 17.1 µSv/h → red (20.0 bucket).
        let expected = legend.classify(6000.0 / 350.0);
        let center = ((128 * 256 + 128) * 4) as usize;
        assert_eq!(
            &pixels[center..center + 4],
            &[expected.r, expected.g, expected.b, 255]
        );
    }

    #[test]
    fn test_zoom_beyond_projection_maximum_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = TileLayout::new(dir.path());
        let field = uniform_field(0.5);

        let result = rasterize_zoom(
            &field,
            &ColorLegend::safecast(),
            &layout,
            32,
            &RasterizeOptions::default(),
        );
        assert!(matches!(
            result,
            Err(crate::RenderError::Projection(_))
        ));
        // Nothing was written before the zoom was rejected.
        assert!(std::fs::read_dir(dir.path())
            .expect("read_dir")
            .next()
            .is_none());
    }

    #[test]
    fn test_rasterize_zoom_writes_pyramid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = TileLayout::new(dir.path());
        let field = uniform_field(0.5);
        let legend = ColorLegend::safecast();

        let summary = rasterize_zoom(&field, &legend, &layout, 8, &RasterizeOptions::default())
            .expect("valid zoom");
        assert!(summary.tiles_written > 0);
        assert!(summary.failed.is_empty());

        // Every tile in the covering range landed on disk.
        let (xs, ys) = tile_range(&field.bounding_box(), 8).expect("valid zoom");
        for x in xs {
            for y in ys.clone() {
                assert!(dir.path().join(format!("8/{x}/{y}.png")).exists());
            }
        }
    }
}
