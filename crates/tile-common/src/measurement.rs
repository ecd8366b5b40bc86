//! Validated radiation measurement record.

use serde::{Deserialize, Serialize};

/// A validated, geolocated radiation reading.
///
/// Produced by ingestion after unit filtering, numeric coercion and range
/// checks; the value is a raw reading in the source unit (typically counts
/// per minute) and is only converted to a dose rate at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

impl Measurement {
    pub fn new(lat: f64, lon: f64, value: f64) -> Self {
        Self { lat, lon, value }
    }
}
