//! Calendar dates and the continuous Modified Julian Date time scale.
//!
//! Dates before the Gregorian reform (1582-10-15) are interpreted in the
//! Julian calendar; the ten discarded days 1582-10-05 through 1582-10-14 do
//! not exist and are rejected.
//!
//! # Example
//! ```
//! use kepler_kernel::epoch::{date_to_mjd, mjd_to_date, Epoch};
//!
//! let t = date_to_mjd("2000-01-01 00:00:00").unwrap();
//! assert_eq!(t.mjd(), 51544.0);
//! assert_eq!(mjd_to_date(Epoch::from_mjd(51544.5)).unwrap(), "2000-01-01 12:00:00");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MJD_JD_OFFSET, SOLAR_DAY};

const SECONDS_PER_DAY: i64 = 86_400;

/// MJD of 0001-01-01 00:00:00 (Julian calendar).
const MIN_MJD: f64 = -678_577.0;

/// MJD of 10000-01-01 00:00:00 (Gregorian calendar), exclusive upper bound.
const MAX_MJD: f64 = 2_973_484.0;

/// Julian Day Number of 1582-10-15, the first Gregorian date.
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Time conversion errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("Invalid date format '{0}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidFormat(String),

    /// A well-shaped string whose field is impossible (month 13, hour 24, ...).
    /// Belongs to the format class; see [`TimeError::is_format_error`].
    #[error("Invalid date format: field '{field}' out of range: {value}")]
    FieldOutOfRange { field: &'static str, value: i64 },

    #[error("{year:04}-{month:02}-{day:02} falls in the Julian-to-Gregorian calendar gap (1582-10-05 to 1582-10-14)")]
    InvalidCalendarDate { year: i32, month: u8, day: u8 },

    #[error("MJD {0} is outside the representable calendar range (years 1 to 9999)")]
    MjdOutOfRange(f64),
}

impl TimeError {
    /// True for a string that is not a valid `YYYY-MM-DD[ HH:MM:SS]` date.
    pub fn is_format_error(&self) -> bool {
        matches!(self, TimeError::InvalidFormat(_) | TimeError::FieldOutOfRange { .. })
    }
}

/// A civil calendar date and time of day, to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CalendarDate {
    /// Build a validated calendar date.
    ///
    /// Day-of-month limits follow the calendar in force on that date: Julian
    /// leap years before the reform, Gregorian after.
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, TimeError> {
        check_range("year", year as i64, 1, 9999)?;
        check_range("month", month as i64, 1, 12)?;
        check_range("day", day as i64, 1, days_in_month(year, month) as i64)?;
        check_range("hour", hour as i64, 0, 23)?;
        check_range("minute", minute as i64, 0, 59)?;
        check_range("second", second as i64, 0, 59)?;

        if year == 1582 && month == 10 && (5..=14).contains(&day) {
            return Err(TimeError::InvalidCalendarDate { year, month, day });
        }

        Ok(Self { year, month, day, hour, minute, second })
    }

    /// Midnight of the given date.
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, TimeError> {
        Self::new(year, month, day, 0, 0, 0)
    }

    /// Whether this date lies on or after the Gregorian reform.
    pub fn is_gregorian(&self) -> bool {
        (self.year, self.month, self.day) >= (1582, 10, 15)
    }

    /// Seconds elapsed since midnight.
    pub fn seconds_of_day(&self) -> i64 {
        self.hour as i64 * 3_600 + self.minute as i64 * 60 + self.second as i64
    }

    /// Modified Julian Date of this instant.
    ///
    /// Meeus, Astronomical Algorithms, Ch.7, shifted by 2400000.5 days.
    pub fn to_mjd(&self) -> f64 {
        let (y, m) = if self.month <= 2 {
            (self.year as i64 - 1, self.month as i64 + 12)
        } else {
            (self.year as i64, self.month as i64)
        };

        let b = if self.is_gregorian() {
            let a = y / 100;
            2 - a + a / 4
        } else {
            0
        };

        let mjd_day = (365.25 * y as f64).floor() as i64
            + (30.6001 * (m + 1) as f64).floor() as i64
            + self.day as i64
            + b
            - 679_006;

        mjd_day as f64 + self.seconds_of_day() as f64 / SOLAR_DAY
    }

    /// Calendar date of an MJD value, rounded to the nearest second.
    pub fn from_mjd(mjd: f64) -> Result<Self, TimeError> {
        if !(MIN_MJD..MAX_MJD).contains(&mjd) {
            return Err(TimeError::MjdOutOfRange(mjd));
        }

        let day_start = mjd.floor();
        // Julian Day Number of the civil day (JD at its noon)
        let mut jdn = day_start as i64 + 2_400_001;
        let mut secs = ((mjd - day_start) * SOLAR_DAY).round() as i64;
        if secs >= SECONDS_PER_DAY {
            secs -= SECONDS_PER_DAY;
            jdn += 1;
        }

        let (year, month, day) = jdn_to_calendar(jdn);
        if !(1..=9999).contains(&year) {
            return Err(TimeError::MjdOutOfRange(mjd));
        }

        Ok(Self {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            hour: (secs / 3_600) as u8,
            minute: (secs % 3_600 / 60) as u8,
            second: (secs % 60) as u8,
        })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FromStr for CalendarDate {
    type Err = TimeError;

    /// Accepts exactly `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, TimeError> {
        let invalid = || TimeError::InvalidFormat(s.to_string());

        let (date, time) = match s.split_once(' ') {
            Some((d, t)) => (d, Some(t)),
            None => (s, None),
        };

        let db = date.as_bytes();
        if db.len() != 10 || db[4] != b'-' || db[7] != b'-' {
            return Err(invalid());
        }
        let year = parse_digits(&date[0..4]).ok_or_else(invalid)?;
        let month = parse_digits(&date[5..7]).ok_or_else(invalid)?;
        let day = parse_digits(&date[8..10]).ok_or_else(invalid)?;

        let (hour, minute, second) = match time {
            None => (0, 0, 0),
            Some(t) => {
                let tb = t.as_bytes();
                if tb.len() != 8 || tb[2] != b':' || tb[5] != b':' {
                    return Err(invalid());
                }
                (
                    parse_digits(&t[0..2]).ok_or_else(invalid)?,
                    parse_digits(&t[3..5]).ok_or_else(invalid)?,
                    parse_digits(&t[6..8]).ok_or_else(invalid)?,
                )
            }
        };

        Self::new(
            year as i32,
            month as u8,
            day as u8,
            hour as u8,
            minute as u8,
            second as u8,
        )
    }
}

/// An instant on the continuous MJD time scale (days since 1858-11-17 00:00).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Epoch {
    mjd: f64,
}

impl Epoch {
    // ── Constructors ──────────────────────────────────────────────

    /// Create an Epoch from a Modified Julian Date.
    pub const fn from_mjd(mjd: f64) -> Self {
        Self { mjd }
    }

    /// Create an Epoch from a validated calendar date.
    pub fn from_calendar(date: &CalendarDate) -> Self {
        Self { mjd: date.to_mjd() }
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// Modified Julian Date (days).
    pub const fn mjd(&self) -> f64 {
        self.mjd
    }

    /// Julian Date (days).
    pub fn jd(&self) -> f64 {
        self.mjd + MJD_JD_OFFSET
    }

    /// Calendar date, rounded to the nearest second.
    pub fn to_calendar(&self) -> Result<CalendarDate, TimeError> {
        CalendarDate::from_mjd(self.mjd)
    }

    /// Split into integer MJD day and seconds of that day.
    pub fn day_and_seconds(&self) -> (i64, f64) {
        let day = self.mjd.floor();
        (day as i64, (self.mjd - day) * SOLAR_DAY)
    }

    // ── Arithmetic ────────────────────────────────────────────────

    /// Add seconds to this epoch.
    pub fn add_seconds(&self, secs: f64) -> Self {
        Self {
            mjd: self.mjd + secs / SOLAR_DAY,
        }
    }

    /// Duration between two epochs in seconds.
    pub fn seconds_since(&self, other: &Epoch) -> f64 {
        (self.mjd - other.mjd) * SOLAR_DAY
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_calendar() {
            Ok(date) => write!(f, "{date}"),
            Err(_) => write!(f, "MJD {:.6}", self.mjd),
        }
    }
}

impl FromStr for Epoch {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, TimeError> {
        date_to_mjd(s)
    }
}

impl std::ops::Sub for Epoch {
    type Output = f64;
    /// Returns duration in seconds.
    fn sub(self, rhs: Self) -> f64 {
        self.seconds_since(&rhs)
    }
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` into an MJD epoch.
pub fn date_to_mjd(date: &str) -> Result<Epoch, TimeError> {
    let cal = date.parse::<CalendarDate>()?;
    Ok(Epoch::from_calendar(&cal))
}

/// Render an epoch as `YYYY-MM-DD HH:MM:SS`.
pub fn mjd_to_date(epoch: Epoch) -> Result<String, TimeError> {
    Ok(epoch.to_calendar()?.to_string())
}

// ── Helpers ────────────────────────────────────────────────────────

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), TimeError> {
    if value < min || value > max {
        return Err(TimeError::FieldOutOfRange { field, value });
    }
    Ok(())
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_leap_year(year: i32) -> bool {
    if year <= 1582 {
        year % 4 == 0
    } else {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Julian Day Number to (year, month, day), Julian calendar before the reform.
/// Meeus, Astronomical Algorithms, Ch.7.
fn jdn_to_calendar(jdn: i64) -> (i64, i64, i64) {
    let a = if jdn < GREGORIAN_REFORM_JDN {
        jdn
    } else {
        let alpha = ((jdn as f64 - 1_867_216.25) / 36_524.25).floor() as i64;
        jdn + 1 + alpha - alpha / 4
    };
    let b = a + 1524;
    let c = ((b as f64 - 122.1) / 365.25).floor() as i64;
    let d = (365.25 * c as f64).floor() as i64;
    let e = ((b - d) as f64 / 30.6001).floor() as i64;

    let day = b - d - (30.6001 * e as f64).floor() as i64;
    let month = if e < 14 { e - 1 } else { e - 13 };
    let year = if month > 2 { c - 4716 } else { c - 4715 };
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_j2000_midnight() {
        assert_eq!(date_to_mjd("2000-01-01 00:00:00").unwrap().mjd(), 51544.0);
        assert_eq!(date_to_mjd("2000-01-01").unwrap().mjd(), 51544.0);
    }

    #[test]
    fn test_known_dates() {
        assert_eq!(mjd_to_date(Epoch::from_mjd(51544.0)).unwrap(), "2000-01-01 00:00:00");
        assert_eq!(mjd_to_date(Epoch::from_mjd(51544.5)).unwrap(), "2000-01-01 12:00:00");
        // MJD zero point
        assert_eq!(date_to_mjd("1858-11-17").unwrap().mjd(), 0.0);
        assert_eq!(mjd_to_date(Epoch::from_mjd(0.0)).unwrap(), "1858-11-17 00:00:00");
    }

    #[test]
    fn test_time_of_day_fraction() {
        let t = date_to_mjd("2024-06-15 18:30:45").unwrap();
        let expected = 60476.0 + (18.0 * 3600.0 + 30.0 * 60.0 + 45.0) / 86400.0;
        assert_relative_eq!(t.mjd(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_reform_boundary_is_contiguous() {
        let last_julian = date_to_mjd("1582-10-04").unwrap().mjd();
        let first_gregorian = date_to_mjd("1582-10-15").unwrap().mjd();
        assert_eq!(last_julian, -100_841.0);
        assert_eq!(first_gregorian, -100_840.0);

        assert_eq!(mjd_to_date(Epoch::from_mjd(-100_841.0)).unwrap(), "1582-10-04 00:00:00");
        assert_eq!(mjd_to_date(Epoch::from_mjd(-100_840.0)).unwrap(), "1582-10-15 00:00:00");
    }

    #[test]
    fn test_calendar_gap_rejected() {
        for day in 5..=14 {
            let s = format!("1582-10-{day:02} 12:00:00");
            assert!(
                matches!(date_to_mjd(&s), Err(TimeError::InvalidCalendarDate { day: d, .. }) if d == day),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn test_julian_leap_day_before_reform() {
        // 1500 is a leap year in the Julian calendar only
        let t = date_to_mjd("1500-02-29").unwrap();
        assert_eq!(mjd_to_date(t).unwrap(), "1500-02-29 00:00:00");
        assert!(date_to_mjd("1900-02-29").is_err());
        assert!(date_to_mjd("2000-02-29").is_ok());
    }

    #[test]
    fn test_invalid_formats() {
        for s in [
            "",
            "2000/01/01",
            "2000-1-1",
            "20000-01-01",
            "2000-01-01T00:00:00",
            "2000-01-01 00:00",
            "2000-01-01 0a:00:00",
            "2000-01-01 00:00:00.",
            "2000-01-01 00:00:00xyz",
            "abcd-ef-gh",
            " 2000-01-01",
            "2000-01-01 ",
            "2000-01-01 00:00:00 ",
            "\t2000-01-01\n",
            "2000-01-01  00:00:00",
        ] {
            assert!(
                matches!(date_to_mjd(s), Err(TimeError::InvalidFormat(_))),
                "'{s}' should be a format error"
            );
        }
    }

    #[test]
    fn test_format_error_class() {
        for s in ["2000-13-01", "2000-02-30", "2000-01-01 00:60:00", "2000/01/01"] {
            let err = date_to_mjd(s).unwrap_err();
            assert!(err.is_format_error(), "'{s}': {err}");
            assert!(err.to_string().starts_with("Invalid date format"));
        }
        assert!(!date_to_mjd("1582-10-10").unwrap_err().is_format_error());
        assert!(!mjd_to_date(Epoch::from_mjd(f64::NAN)).unwrap_err().is_format_error());
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(matches!(
            date_to_mjd("2000-13-01"),
            Err(TimeError::FieldOutOfRange { field: "month", .. })
        ));
        assert!(matches!(
            date_to_mjd("2000-04-31"),
            Err(TimeError::FieldOutOfRange { field: "day", .. })
        ));
        assert!(matches!(
            date_to_mjd("2000-01-01 24:00:00"),
            Err(TimeError::FieldOutOfRange { field: "hour", .. })
        ));
        assert!(matches!(
            date_to_mjd("0000-01-01"),
            Err(TimeError::FieldOutOfRange { field: "year", .. })
        ));
    }

    #[test]
    fn test_fractional_seconds_rejected() {
        for s in ["2000-01-01 00:00:01.5", "2000-01-01 00:00:01.999"] {
            assert_eq!(date_to_mjd(s), Err(TimeError::InvalidFormat(s.to_string())));
        }
    }

    #[test]
    fn test_rounding_carries_into_next_day() {
        let t = Epoch::from_mjd(51544.0 - 0.1 / 86400.0);
        assert_eq!(mjd_to_date(t).unwrap(), "2000-01-01 00:00:00");
        let t = Epoch::from_mjd(51543.999_999_9);
        assert_eq!(mjd_to_date(t).unwrap(), "2000-01-01 00:00:00");
    }

    #[test]
    fn test_mjd_out_of_range() {
        assert!(mjd_to_date(Epoch::from_mjd(f64::NAN)).is_err());
        assert!(mjd_to_date(Epoch::from_mjd(f64::INFINITY)).is_err());
        assert!(mjd_to_date(Epoch::from_mjd(-1.0e7)).is_err());
        assert_eq!(
            mjd_to_date(Epoch::from_mjd(MIN_MJD)).unwrap(),
            "0001-01-01 00:00:00"
        );
        assert_eq!(
            mjd_to_date(Epoch::from_mjd(MAX_MJD - 1.0)).unwrap(),
            "9999-12-31 00:00:00"
        );
    }

    #[test]
    fn test_epoch_arithmetic() {
        let t0 = Epoch::from_mjd(51544.0);
        let t1 = t0.add_seconds(43_200.0);
        assert_eq!(t1.mjd(), 51544.5);
        assert_relative_eq!(t1 - t0, 43_200.0, epsilon = 1e-9);
        assert_relative_eq!(t1.jd(), 2_451_545.0, epsilon = 1e-9);

        let (day, sec) = Epoch::from_mjd(51544.25).day_and_seconds();
        assert_eq!(day, 51544);
        assert_relative_eq!(sec, 21_600.0, epsilon = 1e-6);

        let (day, sec) = Epoch::from_mjd(-0.25).day_and_seconds();
        assert_eq!(day, -1);
        assert_relative_eq!(sec, 64_800.0, epsilon = 1e-6);
    }

    #[test]
    fn test_epoch_display_and_parse() {
        let t: Epoch = "2024-02-29 23:59:59".parse().unwrap();
        assert_eq!(t.to_string(), "2024-02-29 23:59:59");
        assert_eq!(Epoch::from_mjd(f64::NAN).to_string(), "MJD NaN");
    }

    fn calendar_strategy() -> impl Strategy<Value = CalendarDate> {
        (1i32..=9999, 1u8..=12, 1u8..=31, 0u8..24, 0u8..60, 0u8..60).prop_filter_map(
            "valid calendar date",
            |(y, mo, d, h, mi, s)| CalendarDate::new(y, mo, d, h, mi, s).ok(),
        )
    }

    proptest! {
        #[test]
        fn prop_date_round_trip(date in calendar_strategy()) {
            let text = date.to_string();
            let epoch = date_to_mjd(&text).unwrap();
            prop_assert_eq!(mjd_to_date(epoch).unwrap(), text);
        }

        #[test]
        fn prop_consecutive_days_differ_by_one(date in calendar_strategy()) {
            let mjd = date.to_mjd();
            let next = CalendarDate::from_mjd(mjd + 1.0);
            prop_assume!(next.is_ok());
            let next = next.unwrap();
            prop_assert!((next.to_mjd() - mjd - 1.0).abs() < 1e-6);
            prop_assert_eq!(next.seconds_of_day(), date.seconds_of_day());
        }
    }
}
