//! Coordinate types and WGS-84 conversions.
//!
//! Provides inertial (ECI) and Earth-fixed (ECEF) positions in meters, geodetic
//! coordinates, local ENU offsets and observer look angles. [`Wgs84`] is the
//! default implementation of the frame and geodetic converter capabilities.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::epoch::Epoch;
use crate::propagator::{FrameConverter, GeodeticConverter};

/// Inertial position in meters (TEME/GCRS-like; the propagator decides).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EciPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EciPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Earth-Centered, Earth-Fixed position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcefPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EcefPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance to another ECEF position in meters.
    pub fn distance_to(&self, other: &EcefPosition) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance from the Earth's centre in meters.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Each component rounded to centimeters.
    pub fn round_cm(&self) -> Self {
        Self {
            x: round_to(self.x, 2),
            y: round_to(self.y, 2),
            z: round_to(self.z, 2),
        }
    }
}

/// Latitude, longitude, altitude on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    /// Latitude in degrees (-90 to +90)
    pub lat_deg: f64,
    /// Longitude in degrees (-180 to +180)
    pub lon_deg: f64,
    /// Height above the ellipsoid in meters
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self { lat_deg, lon_deg, alt_m }
    }

    pub fn lat_rad(&self) -> f64 {
        self.lat_deg * DEG2RAD
    }

    pub fn lon_rad(&self) -> f64 {
        self.lon_deg * DEG2RAD
    }
}

/// Look angle from an observer to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngle {
    /// Elevation above the local horizon (deg)
    pub elevation_deg: f64,
    /// Azimuth clockwise from north (deg), in [0, 360)
    pub azimuth_deg: f64,
    /// Slant range (m)
    pub range_m: f64,
}

/// Round `value` to `decimals` decimal places (half away from zero).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Convert geodetic coordinates to ECEF.
pub fn geodetic_to_ecef(lla: &Geodetic) -> EcefPosition {
    let (sin_lat, cos_lat) = lla.lat_rad().sin_cos();
    let (sin_lon, cos_lon) = lla.lon_rad().sin_cos();

    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    EcefPosition {
        x: (n + lla.alt_m) * cos_lat * cos_lon,
        y: (n + lla.alt_m) * cos_lat * sin_lon,
        z: (n * (1.0 - WGS84_E2) + lla.alt_m) * sin_lat,
    }
}

/// Convert ECEF to geodetic coordinates (iterative Bowring).
pub fn ecef_to_geodetic(ecef: &EcefPosition) -> Geodetic {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let lon = ecef.y.atan2(ecef.x);

    let mut lat = ecef.z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        lat = (ecef.z + WGS84_E2 * n * sin_lat).atan2(p);
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let alt_m = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        ecef.z.abs() - n * (1.0 - WGS84_E2)
    };

    Geodetic {
        lat_deg: lat * RAD2DEG,
        lon_deg: lon * RAD2DEG,
        alt_m,
    }
}

/// Rotate an ECEF offset into the local East-North-Up frame at `origin`.
pub fn ecef_offset_to_enu(origin: &Geodetic, dx: f64, dy: f64, dz: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = origin.lat_rad().sin_cos();
    let (sin_lon, cos_lon) = origin.lon_rad().sin_cos();

    let east = -sin_lon * dx + cos_lon * dy;
    let north = -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz;
    let up = cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz;
    [east, north, up]
}

/// Rotate a local East-North-Up offset at `origin` into an ECEF offset.
pub fn enu_to_ecef_offset(origin: &Geodetic, enu: [f64; 3]) -> [f64; 3] {
    let (sin_lat, cos_lat) = origin.lat_rad().sin_cos();
    let (sin_lon, cos_lon) = origin.lon_rad().sin_cos();
    let [e, n, u] = enu;

    [
        -sin_lon * e - sin_lat * cos_lon * n + cos_lat * cos_lon * u,
        cos_lon * e - sin_lat * sin_lon * n + cos_lat * sin_lon * u,
        cos_lat * n + sin_lat * u,
    ]
}

/// Compute elevation, azimuth and slant range from an observer to a target.
pub fn look_angle(observer: &Geodetic, target: &EcefPosition) -> LookAngle {
    let obs = geodetic_to_ecef(observer);
    let dx = target.x - obs.x;
    let dy = target.y - obs.y;
    let dz = target.z - obs.z;
    let range_m = (dx * dx + dy * dy + dz * dz).sqrt();

    let [east, north, up] = ecef_offset_to_enu(observer, dx, dy, dz);

    let elevation_deg = up.atan2((east * east + north * north).sqrt()) * RAD2DEG;
    let azimuth_deg = (east.atan2(north) * RAD2DEG).rem_euclid(360.0);

    LookAngle {
        elevation_deg,
        azimuth_deg,
        range_m,
    }
}

/// WGS-84 Earth model with a GMST-only Earth rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl FrameConverter for Wgs84 {
    fn to_earth_fixed(&self, position: &EciPosition, at: &Epoch) -> EcefPosition {
        let (sin_g, cos_g) = at.gmst_rad().sin_cos();

        // Rotate about Z by -GMST
        EcefPosition {
            x: position.x * cos_g + position.y * sin_g,
            y: -position.x * sin_g + position.y * cos_g,
            z: position.z,
        }
    }
}

impl GeodeticConverter for Wgs84 {
    fn to_geodetic(&self, position: &EcefPosition) -> Geodetic {
        ecef_to_geodetic(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geodetic_roundtrip_sichuan() {
        let lla = Geodetic::new(30.0, 104.0, 500.0);
        let back = ecef_to_geodetic(&geodetic_to_ecef(&lla));
        assert_relative_eq!(back.lat_deg, 30.0, epsilon = 1e-9);
        assert_relative_eq!(back.lon_deg, 104.0, epsilon = 1e-9);
        assert_relative_eq!(back.alt_m, 500.0, epsilon = 1e-4);
    }

    #[test]
    fn test_equator_prime_meridian() {
        let ecef = geodetic_to_ecef(&Geodetic::new(0.0, 0.0, 0.0));
        assert_relative_eq!(ecef.x, WGS84_A, epsilon = 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_look_angle_zenith() {
        let obs = Geodetic::new(0.0, 0.0, 0.0);
        let target = EcefPosition::new(WGS84_A + 550_000.0, 0.0, 0.0);
        let la = look_angle(&obs, &target);
        assert_relative_eq!(la.elevation_deg, 90.0, epsilon = 1e-6);
        assert_relative_eq!(la.range_m, 550_000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_look_angle_below_horizon() {
        let obs = Geodetic::new(0.0, 0.0, 0.0);
        let target = EcefPosition::new(-WGS84_A - 550_000.0, 0.0, 0.0);
        assert!(look_angle(&obs, &target).elevation_deg < 0.0);
    }

    #[test]
    fn test_enu_roundtrip() {
        let origin = Geodetic::new(30.0, 104.0, 0.0);
        let d = enu_to_ecef_offset(&origin, [100.0, -50.0, 10.0]);
        let enu = ecef_offset_to_enu(&origin, d[0], d[1], d[2]);
        assert_relative_eq!(enu[0], 100.0, epsilon = 1e-9);
        assert_relative_eq!(enu[1], -50.0, epsilon = 1e-9);
        assert_relative_eq!(enu[2], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_earth_rotation_preserves_radius() {
        let eci = EciPosition::new(4_000_000.0, 5_000_000.0, 1_000_000.0);
        let at = Epoch::from_utc(2026, 1, 27, 12, 0, 0).unwrap();
        let ecef = Wgs84.to_earth_fixed(&eci, &at);
        let r_eci = (eci.x.powi(2) + eci.y.powi(2) + eci.z.powi(2)).sqrt();
        assert_relative_eq!(ecef.norm(), r_eci, epsilon = 1e-6);
        assert_eq!(ecef.z, eci.z);
    }

    #[test]
    fn test_round_cm() {
        let p = EcefPosition::new(1.005_1, -2.344_9, 3.0).round_cm();
        assert_eq!(p, EcefPosition::new(1.01, -2.34, 3.0));
    }
}
