//! UTC reference instants.
//!
//! Scenario time is an integer millisecond offset from a fixed reference
//! epoch, so every sampled instant is `epoch + k * step_ms` exactly. Sidereal
//! time for the inertial → Earth-fixed rotation is derived here as well.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Human-readable UTC format used in manifests and logs.
pub const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MS_PER_DAY: f64 = 86_400_000.0;
/// Julian date of the Unix epoch (1970-01-01T00:00:00 UTC).
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// An instant in UTC with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch {
    utc: DateTime<Utc>,
}

impl Epoch {
    /// Create an epoch from a UTC calendar date and time.
    ///
    /// Returns `None` for dates that do not exist.
    pub fn from_utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(|utc| Self { utc })
    }

    pub fn from_datetime(utc: DateTime<Utc>) -> Self {
        Self { utc }
    }

    /// Epoch from a year and fractional day-of-year (day 1.0 = Jan 1 00:00), as
    /// carried by TLE epochs.
    pub fn from_year_day(year: i32, day_of_year: f64) -> Option<Self> {
        if !day_of_year.is_finite() || day_of_year < 1.0 {
            return None;
        }
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
        let offset_ms = ((day_of_year - 1.0) * MS_PER_DAY).round() as i64;
        let naive = jan1.checked_add_signed(Duration::milliseconds(offset_ms))?;
        Some(Self { utc: Utc.from_utc_datetime(&naive) })
    }

    /// Parse `YYYY-MM-DD HH:MM:SS` (interpreted as UTC).
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let naive = NaiveDateTime::parse_from_str(s.trim(), UTC_FORMAT)?;
        Ok(Self { utc: Utc.from_utc_datetime(&naive) })
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.utc
    }

    /// The instant `ms` milliseconds after this one.
    pub fn add_millis(&self, ms: u64) -> Self {
        Self {
            utc: self.utc + Duration::milliseconds(ms as i64),
        }
    }

    /// Signed duration from `other` to `self` in seconds.
    pub fn seconds_since(&self, other: &Epoch) -> f64 {
        (self.utc - other.utc).num_milliseconds() as f64 / MS_PER_SEC as f64
    }

    /// Julian date (UTC, leap seconds ignored).
    pub fn julian_date(&self) -> f64 {
        self.utc.timestamp_millis() as f64 / MS_PER_DAY + JD_UNIX_EPOCH
    }

    /// Greenwich Mean Sidereal Time (rad), IAU 1982 model, in [0, 2π).
    pub fn gmst_rad(&self) -> f64 {
        let d = self.julian_date() - JD_J2000;
        let t = d / DAYS_PER_CENTURY;

        let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0;

        gmst_deg.rem_euclid(360.0) * DEG2RAD
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.utc.format(UTC_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_j2000_julian_date() {
        let t = Epoch::from_utc(2000, 1, 1, 12, 0, 0).unwrap();
        assert_relative_eq!(t.julian_date(), JD_J2000, epsilon = 1e-9);
    }

    #[test]
    fn test_gmst_at_j2000() {
        // GMST at J2000 is 280.46061837°
        let t = Epoch::from_utc(2000, 1, 1, 12, 0, 0).unwrap();
        assert_relative_eq!(t.gmst_rad() * RAD2DEG, 280.460_618_37, epsilon = 1e-6);
    }

    #[test]
    fn test_add_millis_is_exact() {
        let t0 = Epoch::from_utc(2026, 1, 27, 12, 0, 0).unwrap();
        let t1 = t0.add_millis(599_900);
        assert_relative_eq!(t1.seconds_since(&t0), 599.9, epsilon = 1e-12);
        assert_eq!(t1.to_string(), "2026-01-27 12:09:59");
    }

    #[test]
    fn test_parse_and_display() {
        let t = Epoch::parse("2026-01-27 12:00:00").unwrap();
        assert_eq!(t, Epoch::from_utc(2026, 1, 27, 12, 0, 0).unwrap());
        assert_eq!(t.to_string(), "2026-01-27 12:00:00");
        assert!(Epoch::parse("27/01/2026").is_err());
    }

    #[test]
    fn test_from_year_day() {
        let t = Epoch::from_year_day(2024, 1.5).unwrap();
        assert_eq!(t, Epoch::from_utc(2024, 1, 1, 12, 0, 0).unwrap());
        assert!(Epoch::from_year_day(2024, 0.5).is_none());
    }
}
