//! Grid artifact persistence.
//!
//! A grid is stored as two files: the dense value array as little-endian
//! f32s at the given path, and a JSON sidecar at `<path>.json` carrying the
//! shape and bounding box. The rasterizer consumes the pair without
//! re-deriving bounds from the data.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tile_common::BoundingBox;
use tracing::info;

use crate::error::{GridBuilderError, Result};
use crate::grid::InterpolatedGrid;

/// Sidecar metadata persisted alongside the value array.
#[derive(Debug, Serialize, Deserialize)]
struct GridSidecar {
    rows: usize,
    cols: usize,
    bbox: BoundingBox,
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".json");
    PathBuf::from(os)
}

/// Persist a grid to `path` (values) and `<path>.json` (sidecar).
pub fn write_grid(grid: &InterpolatedGrid, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let values = grid.values();
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, &bytes)?;

    let (rows, cols) = grid.shape();
    let sidecar = GridSidecar {
        rows,
        cols,
        bbox: grid.bounding_box(),
    };
    fs::write(sidecar_path(path), serde_json::to_vec_pretty(&sidecar)?)?;

    info!(path = %path.display(), rows, cols, "grid artifact written");
    Ok(())
}

/// Load a grid previously written by [`write_grid`].
pub fn read_grid(path: &Path) -> Result<InterpolatedGrid> {
    let sidecar: GridSidecar = serde_json::from_slice(&fs::read(sidecar_path(path))?)?;
    let bytes = fs::read(path)?;

    let expected = sidecar.rows * sidecar.cols;
    if bytes.len() != expected * 4 {
        return Err(GridBuilderError::ShapeMismatch {
            path: path.display().to_string(),
            expected,
            actual: bytes.len() / 4,
        });
    }

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(InterpolatedGrid::from_parts(
        values,
        sidecar.rows,
        sidecar.cols,
        sidecar.bbox,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GridBuilder, GridBuilderConfig};
    use tile_common::Measurement;

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grid.f32");

        let cfg = GridBuilderConfig {
            rows: 16,
            cols: 16,
            radius: 0.2,
            ..Default::default()
        };
        let grid = GridBuilder::new(cfg).expect("valid").build(vec![
            Measurement::new(35.0, 139.0, 120.0),
            Measurement::new(35.1, 139.1, 80.0),
        ]);

        write_grid(&grid, &path).expect("write");
        let loaded = read_grid(&path).expect("read");

        assert_eq!(loaded.shape(), grid.shape());
        assert_eq!(loaded.bounding_box(), grid.bounding_box());
        for (a, b) in loaded.values().iter().zip(grid.values()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn test_shape_mismatch_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grid.f32");

        let grid = GridBuilder::new(GridBuilderConfig {
            rows: 4,
            cols: 4,
            ..Default::default()
        })
        .expect("valid")
        .build(Vec::new());
        write_grid(&grid, &path).expect("write");

        // Truncate the value file behind the sidecar's back.
        std::fs::write(&path, [0u8; 8]).expect("truncate");
        assert!(matches!(
            read_grid(&path),
            Err(GridBuilderError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_artifact_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            read_grid(&dir.path().join("absent.f32")),
            Err(GridBuilderError::Io(_))
        ));
    }
}
