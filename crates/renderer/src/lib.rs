//! Tile rendering: grid-to-tile rasterization and direct point drawing.

pub mod error;
pub mod points;
pub mod raster;

pub use error::{RenderError, Result};
pub use points::{PointRenderer, PointRendererConfig, RenderReport};
pub use raster::{rasterize_zoom, GridField, RasterSummary, RasterizeOptions};
