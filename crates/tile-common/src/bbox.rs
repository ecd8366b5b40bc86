//! Geographic bounding box type and operations.

use serde::{Deserialize, Serialize};

/// Nudge applied to a degenerate axis so pixel resolutions never divide by zero.
const DEGENERATE_AXIS_EPSILON: f64 = 1e-6;

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Derive the extent of a point cloud. Returns `None` for an empty cloud.
    ///
    /// A degenerate axis (all points sharing one longitude or latitude) is
    /// widened by a small epsilon so downstream resolution math stays finite.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lon0, lat0) = iter.next()?;
        let mut bbox = Self::new(lon0, lat0, lon0, lat0);
        for (lon, lat) in iter {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        Some(bbox.nudge_degenerate())
    }

    /// Grow the box outward by `margin` degrees on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.min_lon - margin,
            self.min_lat - margin,
            self.max_lon + margin,
            self.max_lat + margin,
        )
    }

    /// Widen any zero-width axis by a small epsilon.
    pub fn nudge_degenerate(mut self) -> Self {
        if self.min_lon == self.max_lon {
            self.max_lon += DEGENERATE_AXIS_EPSILON;
        }
        if self.min_lat == self.max_lat {
            self.max_lat += DEGENERATE_AXIS_EPSILON;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_extent() {
        let bbox = BoundingBox::from_points(vec![(139.0, 35.0), (140.0, 35.5), (139.5, 34.8)])
            .expect("non-empty");
        assert_eq!(bbox.min_lon, 139.0);
        assert_eq!(bbox.max_lon, 140.0);
        assert_eq!(bbox.min_lat, 34.8);
        assert_eq!(bbox.max_lat, 35.5);
    }

    #[test]
    fn test_from_points_empty() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_degenerate_axis_nudged() {
        let bbox = BoundingBox::from_points(vec![(139.0, 35.0), (139.0, 36.0)]).expect("non-empty");
        assert!(bbox.width() > 0.0);
        assert_eq!(bbox.height(), 1.0);
    }

    #[test]
    fn test_expand_grows_every_side() {
        let bbox = BoundingBox::new(139.0, 35.0, 140.0, 36.0).expand(0.05);
        assert_eq!(bbox.min_lon, 138.95);
        assert_eq!(bbox.min_lat, 34.95);
        assert_eq!(bbox.max_lon, 140.05);
        assert_eq!(bbox.max_lat, 36.05);
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox::new(130.0, 32.0, 147.45, 46.0);
        assert!(bbox.contains(139.0, 35.0));
        assert!(!bbox.contains(129.0, 35.0));
        assert!(!bbox.contains(139.0, 50.0));
    }
}
