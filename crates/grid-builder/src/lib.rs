//! Spatial interpolation of point measurements onto a dense grid.
//!
//! Builds a static spatial index over a point cloud, evaluates an
//! inverse-distance-weighted estimate at every cell center of a target grid,
//! and persists the result as a compound artifact (raw f32 values plus a
//! JSON sidecar carrying the grid shape and bounding box).
//!
//! Cells are evaluated in disjoint rectangular row bands, so the work
//! distributes across a rayon pool with no locking and no merge step.

pub mod artifact;
pub mod builder;
pub mod error;
pub mod grid;
pub mod index;

pub use artifact::{read_grid, write_grid};
pub use builder::{GridBuilder, GridBuilderConfig};
pub use error::{GridBuilderError, Result};
pub use grid::InterpolatedGrid;
pub use index::SpatialIndex;
