//! Slippy-map coordinate conversions.

use std::ops::RangeInclusive;

use thiserror::Error;
use tile_common::{BoundingBox, TileCoord};

/// Latitude bound of the Web Mercator projection; `atan(sinh(pi))` in degrees.
/// Beyond it the y-tile formula leaves the `[0, 1)` band.
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Deepest zoom level the pyramid index arithmetic supports. At zoom 30 a
/// tile index already needs 30 bits; beyond that the u32 tile space overflows.
pub const MAX_ZOOM: u32 = 30;

/// Errors for geographic input outside the projection's domain.
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("latitude {0}° is outside the Web Mercator band (±{MAX_LATITUDE}°)")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0}° is outside ±180°")]
    LongitudeOutOfRange(f64),

    #[error("zoom {0} exceeds the supported maximum of {MAX_ZOOM}")]
    ZoomOutOfRange(u32),
}

fn validate_zoom(zoom: u32) -> Result<(), ProjectionError> {
    if zoom > MAX_ZOOM {
        return Err(ProjectionError::ZoomOutOfRange(zoom));
    }
    Ok(())
}

fn validate(lat: f64, lon: f64) -> Result<(), ProjectionError> {
    if !lat.is_finite() || lat.abs() > MAX_LATITUDE {
        return Err(ProjectionError::LatitudeOutOfRange(lat));
    }
    if !lon.is_finite() || lon.abs() > 180.0 {
        return Err(ProjectionError::LongitudeOutOfRange(lon));
    }
    Ok(())
}

/// Convert lat/lon to integer tile indices at the given zoom.
///
/// Latitudes beyond the Mercator band, or zooms past [`MAX_ZOOM`], are a
/// domain error rather than silently undefined math.
pub fn deg_to_tile(lat: f64, lon: f64, zoom: u32) -> Result<(u32, u32), ProjectionError> {
    validate_zoom(zoom)?;
    validate(lat, lon)?;
    let n = 2f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    // lon = 180 or lat = -MAX_LATITUDE land exactly on the pyramid edge;
    // fold them into the last tile.
    Ok((
        (x as i64).clamp(0, max_index as i64) as u32,
        (y as i64).clamp(0, max_index as i64) as u32,
    ))
}

/// Convert tile indices to the lat/lon of the tile's north-west corner.
pub fn tile_to_deg(x: u32, y: u32, zoom: u32) -> (f64, f64) {
    let n = 2f64.powi(zoom as i32);
    let lon_deg = x as f64 / n * 360.0 - 180.0;
    let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan();
    (lat_rad.to_degrees(), lon_deg)
}

/// Convert lat/lon to pixel coordinates within the given tile.
///
/// The fractional tile position is scaled to pixel units and truncated, so a
/// point exactly on a tile boundary belongs to the tile whose origin is at
/// or below it (floor semantics).
pub fn deg_to_pixel(
    lat: f64,
    lon: f64,
    tile_x: u32,
    tile_y: u32,
    zoom: u32,
    tile_size: u32,
) -> Result<(i64, i64), ProjectionError> {
    validate_zoom(zoom)?;
    validate(lat, lon)?;
    let n = 2f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();

    let precise_x = (lon + 180.0) / 360.0 * n;
    let precise_y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n;

    let px = ((precise_x - tile_x as f64) * tile_size as f64).floor() as i64;
    let py = ((precise_y - tile_y as f64) * tile_size as f64).floor() as i64;
    Ok((px, py))
}

/// Geographic bounding box of a tile.
pub fn tile_bbox(coord: &TileCoord) -> BoundingBox {
    let (max_lat, min_lon) = tile_to_deg(coord.x, coord.y, coord.z);
    let (min_lat, max_lon) = tile_to_deg(coord.x + 1, coord.y + 1, coord.z);
    BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
}

/// Inclusive x/y tile ranges covering a geographic bounding box at a zoom.
///
/// The box is clamped into the projection's valid domain first, so a grid
/// that slightly exceeds the Mercator band still yields a usable range
/// instead of an error.
pub fn tile_range(
    bbox: &BoundingBox,
    zoom: u32,
) -> Result<(RangeInclusive<u32>, RangeInclusive<u32>), ProjectionError> {
    validate_zoom(zoom)?;
    let clamp_lat = |lat: f64| lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let clamp_lon = |lon: f64| lon.clamp(-180.0, 180.0);

    // NW corner gives the minimum indices, SE corner the maximum.
    let (x_min, y_min) = deg_to_tile(clamp_lat(bbox.max_lat), clamp_lon(bbox.min_lon), zoom)
        .expect("clamped coordinates are in domain");
    let (x_max, y_max) = deg_to_tile(clamp_lat(bbox.min_lat), clamp_lon(bbox.max_lon), zoom)
        .expect("clamped coordinates are in domain");

    Ok((x_min..=x_max, y_min..=y_max))
}
