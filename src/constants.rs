//! Physical and astrodynamic constants.

/// Earth gravitational parameter (km³/s²), WGS84
pub const MU_EARTH: f64 = 398600.4418;

/// Earth equatorial radius (km), WGS84
pub const R_EARTH: f64 = 6378.137;

/// Earth J2 zonal harmonic, WGS84/EGM96
pub const J2: f64 = 1.08262668e-3;

/// Seconds per solar day
pub const SOLAR_DAY: f64 = 86400.0;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

// ── WGS-84 ellipsoid (meters) ──

/// WGS-84 semi-major axis (m)
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS-84 first eccentricity squared
pub const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Mean Earth radius (km), the lower bound used for trace radius checks.
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

// ── Time ──

/// Milliseconds per second
pub const MS_PER_SEC: u64 = 1000;

/// Julian date of the J2000 epoch (2000-01-01 12:00:00)
pub const JD_J2000: f64 = 2_451_545.0;

/// Days per Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;
