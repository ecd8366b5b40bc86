//! Dose-rate color legend.
//!
//! Maps a scalar dose rate (µSv/h) to a display color through an ordered
//! table of upper thresholds. The table is total over `[0, +inf)`: the last
//! entry always carries an infinite threshold, so every input classifies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Safecast bGeigie conversion factor from counts per minute to µSv/h.
pub const DEFAULT_CPM_PER_USVH: f64 = 350.0;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Errors raised while constructing or loading a legend.
#[derive(Debug, Error)]
pub enum LegendError {
    #[error("legend must have at least one entry")]
    Empty,

    #[error("legend thresholds must be strictly increasing (entry {0})")]
    NonMonotonic(usize),

    #[error("only the final legend entry may omit its threshold (entry {0})")]
    UnboundedEntry(usize),

    #[error("invalid hex color: {0}")]
    InvalidColor(String),

    #[error("failed to read legend file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse legend file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One legend row as it appears in a JSON legend file.
///
/// `max` is the upper dose-rate bound in µSv/h; the final entry omits it,
/// standing for +inf (JSON has no infinity literal).
#[derive(Debug, Clone, Deserialize)]
pub struct LegendFileEntry {
    #[serde(default)]
    pub max: Option<f64>,
    pub color: String,
}

/// Ordered sequence of `(upper_threshold, color)` pairs covering `[0, +inf)`.
#[derive(Debug, Clone)]
pub struct ColorLegend {
    thresholds: Vec<f64>,
    colors: Vec<Rgb>,
}

impl ColorLegend {
    /// Build a legend from `(upper_threshold, (r, g, b))` pairs.
    ///
    /// Thresholds must be strictly increasing and the final one must be
    /// `f64::INFINITY`.
    pub fn new(entries: Vec<(f64, (u8, u8, u8))>) -> Result<Self, LegendError> {
        if entries.is_empty() {
            return Err(LegendError::Empty);
        }
        let mut thresholds = Vec::with_capacity(entries.len());
        let mut colors = Vec::with_capacity(entries.len());
        for (i, (threshold, (r, g, b))) in entries.into_iter().enumerate() {
            if let Some(&prev) = thresholds.last() {
                if threshold <= prev {
                    return Err(LegendError::NonMonotonic(i));
                }
            }
            thresholds.push(threshold);
            colors.push(Rgb::new(r, g, b));
        }
        let last = thresholds.len() - 1;
        for (i, t) in thresholds.iter().enumerate() {
            if t.is_infinite() && i != last {
                return Err(LegendError::UnboundedEntry(i));
            }
        }
        if !thresholds[last].is_infinite() {
            thresholds[last] = f64::INFINITY;
        }
        Ok(Self { thresholds, colors })
    }

    /// The default Safecast-style µSv/h legend.
    pub fn safecast() -> Self {
        // Thresholds and colors from the Safecast web map scale.
        Self::new(vec![
            (0.03, (75, 0, 130)),         // indigo
            (0.05, (0, 0, 139)),          // dark blue
            (0.075, (0, 0, 205)),         // medium blue
            (0.1, (0, 100, 255)),         // dodger blue
            (0.15, (0, 191, 255)),        // deep sky blue
            (0.25, (0, 255, 255)),        // cyan
            (0.5, (0, 128, 0)),           // dark green
            (1.0, (255, 255, 0)),         // yellow
            (5.0, (255, 165, 0)),         // orange
            (20.0, (255, 0, 0)),          // red
            (f64::INFINITY, (139, 0, 0)), // dark red
        ])
        .expect("built-in legend is valid")
    }

    /// Load a legend from a JSON file.
    ///
    /// The file is an array of `{ "max": 0.03, "color": "#4B0082" }` rows in
    /// ascending threshold order; the final row omits `max`.
    pub fn from_file(path: &std::path::Path) -> Result<Self, LegendError> {
        let content = std::fs::read_to_string(path)?;
        let rows: Vec<LegendFileEntry> = serde_json::from_str(&content)?;
        let last = rows.len().checked_sub(1).ok_or(LegendError::Empty)?;
        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let threshold = match row.max {
                Some(t) => t,
                None if i == last => f64::INFINITY,
                None => return Err(LegendError::UnboundedEntry(i)),
            };
            let rgb =
                hex_to_rgb(&row.color).ok_or_else(|| LegendError::InvalidColor(row.color.clone()))?;
            entries.push((threshold, rgb));
        }
        Self::new(entries)
    }

    /// Classify a dose rate into its display color.
    ///
    /// Negative inputs are clamped to zero; the trailing infinite threshold
    /// guarantees a result for all finite inputs.
    pub fn classify(&self, value: f64) -> Rgb {
        self.colors[self.bucket(value)]
    }

    /// Index of the bucket a value falls into (monotonic in the value).
    pub fn bucket(&self, value: f64) -> usize {
        let value = value.max(0.0);
        for (i, &threshold) in self.thresholds.iter().enumerate() {
            if value <= threshold {
                return i;
            }
        }
        self.thresholds.len() - 1
    }

    /// Number of entries in the legend.
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

/// Parse a hex color string ("#RRGGBB" or "RRGGBB") to an RGB triple.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("4B0082"), Some((75, 0, 130)));
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#FFF"), None);
    }

    #[test]
    fn test_classify_boundaries() {
        let legend = ColorLegend::safecast();
        // Exactly on a threshold belongs to that bucket (value <= threshold).
        assert_eq!(legend.classify(0.03), Rgb::new(75, 0, 130));
        assert_eq!(legend.classify(0.031), Rgb::new(0, 0, 139));
        // Negative clamps to zero.
        assert_eq!(legend.classify(-5.0), legend.classify(0.0));
        // Above every finite threshold lands in the top bucket.
        assert_eq!(legend.classify(1e9), Rgb::new(139, 0, 0));
    }

    #[test]
    fn test_bucket_monotonic() {
        let legend = ColorLegend::safecast();
        let samples = [0.0, 0.02, 0.04, 0.09, 0.2, 0.4, 0.9, 4.0, 18.0, 25.0, 1e6];
        for pair in samples.windows(2) {
            assert!(legend.bucket(pair[0]) <= legend.bucket(pair[1]));
        }
    }

    #[test]
    fn test_top_bucket_for_high_dose() {
        let legend = ColorLegend::safecast();
        // 6000 cpm at the default calibration factor is ~17.1 µSv/h.
        let usvh = 6000.0 / DEFAULT_CPM_PER_USVH;
        assert!((usvh - 17.14).abs() < 0.01);
        // That lands in the 20.0 bucket, one below the unbounded top entry.
        assert_eq!(legend.bucket(usvh), legend.len() - 2);
    }

    #[test]
    fn test_rejects_non_monotonic() {
        let result = ColorLegend::new(vec![
            (0.5, (0, 0, 0)),
            (0.25, (1, 1, 1)),
            (f64::INFINITY, (2, 2, 2)),
        ]);
        assert!(matches!(result, Err(LegendError::NonMonotonic(1))));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(ColorLegend::new(vec![]), Err(LegendError::Empty)));
    }

    #[test]
    fn test_final_threshold_forced_infinite() {
        let legend = ColorLegend::new(vec![(1.0, (0, 0, 0)), (2.0, (9, 9, 9))]).expect("valid");
        assert_eq!(legend.classify(1e12), Rgb::new(9, 9, 9));
    }
}
