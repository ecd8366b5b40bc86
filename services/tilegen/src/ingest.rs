//! CSV measurement ingestion.
//!
//! Reads the measurement export layout (`Captured Time, Latitude, Longitude,
//! Value, Unit`) as untyped strings and validates row by row: rows with the
//! wrong unit, unparsable coordinates, non-positive values, or the bogus
//! `0201-` capture timestamps are counted and dropped rather than failing
//! the run. Accepted rows are handed to a sink one at a time, so memory is
//! bounded by the consumer, not the file size.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tile_common::{BoundingBox, Measurement};
use tracing::{debug, info};

/// One raw CSV row. Everything is a string; exports mix numeric and junk
/// values in the same columns.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Captured Time")]
    captured_time: String,
    #[serde(rename = "Latitude")]
    latitude: String,
    #[serde(rename = "Longitude")]
    longitude: String,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "Unit")]
    unit: String,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Unit a row must carry to be accepted, compared case-insensitively.
    pub unit: String,
    /// Optional geographic filter.
    pub extent: Option<BoundingBox>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            unit: "cpm".to_string(),
            extent: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Stream filtered measurements from a CSV export into `sink`, one row at a
/// time.
///
/// Rows never accumulate here, so memory stays bounded regardless of input
/// size; a sink error aborts the stream. A missing or unreadable file is an
/// immediate error; individual bad rows are not.
pub fn stream_measurements(
    path: &Path,
    opts: &IngestOptions,
    mut sink: impl FnMut(Measurement) -> Result<()>,
) -> Result<IngestStats> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut stats = IngestStats::default();
    for row in reader.deserialize::<RawRecord>() {
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "skipping malformed row");
                stats.rejected += 1;
                continue;
            }
        };
        match validate(&record, opts) {
            Some(m) => {
                sink(m)?;
                stats.accepted += 1;
            }
            None => stats.rejected += 1,
        }
    }

    info!(
        path = %path.display(),
        accepted = stats.accepted,
        rejected = stats.rejected,
        "ingested measurements"
    );
    Ok(stats)
}

/// Load every filtered measurement into memory, for consumers that need the
/// whole cloud at once (grid interpolation).
pub fn load_measurements(
    path: &Path,
    opts: &IngestOptions,
) -> Result<(Vec<Measurement>, IngestStats)> {
    let mut points = Vec::new();
    let stats = stream_measurements(path, opts, |m| {
        points.push(m);
        Ok(())
    })?;
    Ok((points, stats))
}

fn validate(record: &RawRecord, opts: &IngestOptions) -> Option<Measurement> {
    if !record.unit.trim().eq_ignore_ascii_case(&opts.unit) {
        return None;
    }
    // Some exports carry rows with a year-0201 capture time; the positions
    // on those rows are unreliable.
    if record.captured_time.starts_with("0201-") {
        return None;
    }

    let lat: f64 = record.latitude.trim().parse().ok()?;
    let lon: f64 = record.longitude.trim().parse().ok()?;
    let value: f64 = record.value.trim().parse().ok()?;
    if !lat.is_finite() || !lon.is_finite() || !value.is_finite() || value <= 0.0 {
        return None;
    }
    if let Some(extent) = &opts.extent {
        if !extent.contains(lon, lat) {
            return None;
        }
    }

    Some(Measurement::new(lat, lon, value))
}
