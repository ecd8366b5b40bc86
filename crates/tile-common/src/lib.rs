//! Common types shared across the radmap tile pipeline.

pub mod bbox;
pub mod legend;
pub mod measurement;
pub mod tile;

pub use bbox::BoundingBox;
pub use legend::{ColorLegend, LegendError, Rgb, DEFAULT_CPM_PER_USVH};
pub use measurement::Measurement;
pub use tile::TileCoord;
