//! On-disk tile pyramid layout.

use std::path::{Path, PathBuf};

use tile_common::TileCoord;

/// Derives tile paths under a pyramid root: `{root}/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct TileLayout {
    root: PathBuf,
}

impl TileLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The pyramid root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for one tile image.
    pub fn tile_path(&self, coord: &TileCoord) -> PathBuf {
        self.root
            .join(coord.z.to_string())
            .join(coord.x.to_string())
            .join(format!("{}.png", coord.y))
    }

    /// Relative URL template for the pyramid, for web-map clients.
    pub fn url_template() -> &'static str {
        "{z}/{x}/{y}.png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path() {
        let layout = TileLayout::new("/tiles/run1");
        let path = layout.tile_path(&TileCoord::new(10, 909, 403));
        assert_eq!(path, PathBuf::from("/tiles/run1/10/909/403.png"));
    }
}
