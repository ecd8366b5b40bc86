//! Tile-set descriptor for the web-map client.
//!
//! Written as `tileset.json` in the output root after each run. Reruns at
//! other zooms widen the existing descriptor instead of replacing it, so a
//! pyramid built one zoom at a time ends up with the full range.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tile_common::BoundingBox;
use tracing::info;

pub const DESCRIPTOR_NAME: &str = "tileset.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilesetDescriptor {
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub tile_size: u32,
    /// URL path template relative to the output root.
    pub tiles: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`; absent until something drew.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
}

impl TilesetDescriptor {
    pub fn new(zoom: u32, tile_size: u32, template: String, bounds: Option<BoundingBox>) -> Self {
        Self {
            min_zoom: zoom,
            max_zoom: zoom,
            tile_size,
            tiles: template,
            bounds: bounds.map(|b| [b.min_lon, b.min_lat, b.max_lon, b.max_lat]),
        }
    }

    /// Widen this descriptor to also cover `other`.
    fn merge(&mut self, other: &TilesetDescriptor) {
        self.min_zoom = self.min_zoom.min(other.min_zoom);
        self.max_zoom = self.max_zoom.max(other.max_zoom);
        self.bounds = match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => Some([
                a[0].min(b[0]),
                a[1].min(b[1]),
                a[2].max(b[2]),
                a[3].max(b[3]),
            ]),
            (a, b) => a.or(b),
        };
    }

    /// Write the descriptor into `root`, merging with any prior run's file.
    pub fn write(mut self, root: &Path) -> Result<()> {
        let path = root.join(DESCRIPTOR_NAME);
        if path.exists() {
            let prior = fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let prior: TilesetDescriptor =
                serde_json::from_slice(&prior).context("parsing existing descriptor")?;
            self.merge(&prior);
        }
        fs::create_dir_all(root)?;
        let body = serde_json::to_vec_pretty(&self)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        info!(
            path = %path.display(),
            min_zoom = self.min_zoom,
            max_zoom = self.max_zoom,
            "wrote tileset descriptor"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_merge_widens_zoom_and_bounds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bbox_a = BoundingBox::new(139.0, 35.0, 140.0, 36.0);
        let bbox_b = BoundingBox::new(138.0, 34.0, 139.5, 35.5);

        TilesetDescriptor::new(10, 256, "{z}/{x}/{y}.png".into(), Some(bbox_a))
            .write(dir.path())
            .expect("write");
        TilesetDescriptor::new(12, 256, "{z}/{x}/{y}.png".into(), Some(bbox_b))
            .write(dir.path())
            .expect("write");

        let body = fs::read(dir.path().join(DESCRIPTOR_NAME)).expect("read");
        let merged: TilesetDescriptor = serde_json::from_slice(&body).expect("parse");
        assert_eq!(merged.min_zoom, 10);
        assert_eq!(merged.max_zoom, 12);
        assert_eq!(merged.bounds, Some([138.0, 34.0, 140.0, 36.0]));
    }

    #[test]
    fn test_bounds_omitted_when_nothing_drawn() {
        let dir = tempfile::tempdir().expect("tempdir");
        TilesetDescriptor::new(8, 256, "{z}/{x}/{y}.png".into(), None)
            .write(dir.path())
            .expect("write");
        let body = fs::read_to_string(dir.path().join(DESCRIPTOR_NAME)).expect("read");
        assert!(!body.contains("bounds"));
    }
}
