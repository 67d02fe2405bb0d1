//! Time-ordered state sequences and their plain-text table format.
//!
//! One sample per line, whitespace separated:
//! ```text
//! # Ephemeris file: MJD_day MJD_sec x(km) y(km) z(km) vx(km/s) vy(km/s) vz(km/s)
//! 51544 0.000000 6928.136300 0.000000 0.000000 0.000000 5.384331548 5.384331548
//! ```
//! Lines starting with `#` and blank lines are ignored on input.

use std::num::{ParseFloatError, ParseIntError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::epoch::Epoch;
use crate::kepler::CartesianState;

/// Header line written by [`Ephemeris::to_text`].
pub const EPHEMERIS_HEADER: &str =
    "# Ephemeris file: MJD_day MJD_sec x(km) y(km) z(km) vx(km/s) vy(km/s) vz(km/s)";

const FIELD_NAMES: [&str; 8] = ["MJD_day", "MJD_sec", "x", "y", "z", "vx", "vy", "vz"];

/// Ephemeris table parsing errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("Line {line}: expected 8 fields, got {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Line {line}: failed to parse integer field '{field}': {source}")]
    ParseIntField {
        line: usize,
        field: &'static str,
        source: ParseIntError,
    },

    #[error("Line {line}: failed to parse field '{field}': {source}")]
    ParseField {
        line: usize,
        field: &'static str,
        source: ParseFloatError,
    },

    #[error("Line {line}: non-finite value in field '{field}'")]
    NonFinite { line: usize, field: &'static str },

    #[error("Line {line}: epoch MJD {mjd} does not follow the previous sample")]
    NotIncreasing { line: usize, mjd: f64 },
}

/// A single time-stamped state (km, km/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EphemerisPoint {
    pub epoch: Epoch,
    pub state: CartesianState,
}

impl EphemerisPoint {
    /// Render as one table line.
    pub fn to_line(&self) -> String {
        let (day, sec) = self.epoch.day_and_seconds();
        let [x, y, z] = self.state.r;
        let [vx, vy, vz] = self.state.v;
        format!("{day} {sec:.6} {x:.6} {y:.6} {z:.6} {vx:.9} {vy:.9} {vz:.9}")
    }

    /// Parse one table line; `line` is the 1-based line number used in errors.
    pub fn parse_line(text: &str, line: usize) -> Result<Self, EphemerisError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != FIELD_NAMES.len() {
            return Err(EphemerisError::FieldCount {
                line,
                found: fields.len(),
            });
        }

        let day: i64 = fields[0]
            .parse()
            .map_err(|source| EphemerisError::ParseIntField {
                line,
                field: FIELD_NAMES[0],
                source,
            })?;

        let mut values = [0.0f64; 7];
        for (k, value) in values.iter_mut().enumerate() {
            *value = fields[k + 1]
                .parse()
                .map_err(|source| EphemerisError::ParseField {
                    line,
                    field: FIELD_NAMES[k + 1],
                    source,
                })?;
            if !value.is_finite() {
                return Err(EphemerisError::NonFinite {
                    line,
                    field: FIELD_NAMES[k + 1],
                });
            }
        }
        let [sec, x, y, z, vx, vy, vz] = values;

        Ok(Self {
            epoch: Epoch::from_mjd(day as f64 + sec / SOLAR_DAY),
            state: CartesianState::new([x, y, z], [vx, vy, vz]),
        })
    }
}

/// Ordered sequence of ephemeris points, strictly increasing in epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ephemeris {
    points: Vec<EphemerisPoint>,
}

impl Ephemeris {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap points already in increasing epoch order.
    pub(crate) fn from_sorted(points: Vec<EphemerisPoint>) -> Self {
        Self { points }
    }

    /// Build from caller-supplied points, checking the epoch order.
    /// The index of the first offending point is reported as `line`.
    pub fn from_points(points: Vec<EphemerisPoint>) -> Result<Self, EphemerisError> {
        if let Some(k) = points.windows(2).position(|w| !(w[1].epoch.mjd() > w[0].epoch.mjd())) {
            return Err(EphemerisError::NotIncreasing {
                line: k + 1,
                mjd: points[k + 1].epoch.mjd(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[EphemerisPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<EphemerisPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EphemerisPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EphemerisPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EphemerisPoint> {
        self.points.iter()
    }

    /// Span between the first and last sample (seconds).
    pub fn duration(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.epoch - first.epoch,
            _ => 0.0,
        }
    }

    /// Sample closest in time to `epoch`; the earlier one on a tie.
    pub fn nearest(&self, epoch: Epoch) -> Option<&EphemerisPoint> {
        let mjd = epoch.mjd();
        let idx = self.points.partition_point(|p| p.epoch.mjd() < mjd);
        let after = self.points.get(idx);
        let before = idx.checked_sub(1).and_then(|k| self.points.get(k));

        match (before, after) {
            (Some(b), Some(a)) => {
                if mjd - b.epoch.mjd() <= a.epoch.mjd() - mjd {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// Render as a table with a header line and one line per sample.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(EPHEMERIS_HEADER.len() + 1 + self.points.len() * 96);
        out.push_str(EPHEMERIS_HEADER);
        out.push('\n');
        for point in &self.points {
            out.push_str(&point.to_line());
            out.push('\n');
        }
        out
    }

    /// Parse a table written by [`Ephemeris::to_text`].
    pub fn parse_text(input: &str) -> Result<Self, EphemerisError> {
        let mut points: Vec<EphemerisPoint> = Vec::new();

        for (idx, raw) in input.lines().enumerate() {
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let point = EphemerisPoint::parse_line(text, idx + 1)?;
            if let Some(prev) = points.last() {
                if !(point.epoch.mjd() > prev.epoch.mjd()) {
                    return Err(EphemerisError::NotIncreasing {
                        line: idx + 1,
                        mjd: point.epoch.mjd(),
                    });
                }
            }
            points.push(point);
        }

        Ok(Self { points })
    }
}

impl<'a> IntoIterator for &'a Ephemeris {
    type Item = &'a EphemerisPoint;
    type IntoIter = std::slice::Iter<'a, EphemerisPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl IntoIterator for Ephemeris {
    type Item = EphemerisPoint;
    type IntoIter = std::vec::IntoIter<EphemerisPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
