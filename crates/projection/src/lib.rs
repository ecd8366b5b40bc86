//! Web Mercator tile pyramid projection.
//!
//! Deterministic lat/lon to tile/pixel coordinate math for the standard
//! slippy-map scheme (z/x/y, top-left origin). All operations on the same
//! inputs yield the same outputs, which is what makes incremental tile
//! runs reproducible.

pub mod web_mercator;

pub use web_mercator::{
    deg_to_pixel, deg_to_tile, tile_bbox, tile_range, tile_to_deg, ProjectionError, MAX_LATITUDE,
    MAX_ZOOM,
};
