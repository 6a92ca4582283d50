//! Propagation and frame-conversion capabilities.
//!
//! The sampler and selector never compute ephemerides themselves. They are
//! handed three narrow capabilities:
//! - [`Propagator`]: node handle + instant → inertial position
//! - [`FrameConverter`]: inertial → Earth-fixed at an instant
//! - [`GeodeticConverter`]: Earth-fixed → latitude/longitude/altitude
//!
//! [`J2Propagator`] is the default propagator for TLE catalogs (analytic J2
//! secular drift of the mean elements); [`crate::frames::Wgs84`] provides both
//! converters. Tests substitute deterministic doubles.

use thiserror::Error;

use crate::catalog::Tle;
use crate::epoch::Epoch;
use crate::frames::{EcefPosition, EciPosition, Geodetic};

/// Failure to resolve a node's position.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("node {0} has no usable orbital elements")]
    Unresolvable(String),

    #[error("node {node} produced a non-finite position at {at}")]
    NonFinite { node: String, at: Epoch },
}

/// Computes a node's inertial position at an instant.
pub trait Propagator: Sync {
    /// Opaque per-node propagation handle carried by the catalog.
    type Handle: Sync;

    fn propagate(&self, handle: &Self::Handle, at: &Epoch) -> Result<EciPosition, PropagationError>;
}

/// Rotates inertial positions into the Earth-fixed frame.
pub trait FrameConverter: Sync {
    fn to_earth_fixed(&self, position: &EciPosition, at: &Epoch) -> EcefPosition;
}

/// Converts Earth-fixed positions to geodetic coordinates.
pub trait GeodeticConverter: Sync {
    fn to_geodetic(&self, position: &EcefPosition) -> Geodetic;
}

/// Analytic propagator: TLE mean elements advanced under J2 secular drift.
///
/// Adequate for scenario geometry over minutes to hours; it does not model
/// drag or short-period terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct J2Propagator;

impl Propagator for J2Propagator {
    type Handle = Tle;

    fn propagate(&self, handle: &Tle, at: &Epoch) -> Result<EciPosition, PropagationError> {
        let elements = handle
            .to_mean_elements()
            .ok_or_else(|| PropagationError::Unresolvable(handle.display_name()))?;

        let dt = at.seconds_since(&elements.epoch);
        let [x, y, z] = elements.drifted(dt).position_km();
        let position = EciPosition::new(x * 1000.0, y * 1000.0, z * 1000.0);

        if !position.is_finite() {
            return Err(PropagationError::NonFinite {
                node: handle.display_name(),
                at: *at,
            });
        }
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use approx::assert_relative_eq;

    fn starlink_like() -> Tle {
        Tle {
            name: Some("STARLINK-TEST".to_string()),
            norad_id: 90001,
            epoch_year: 2026,
            epoch_day: 27.5,
            bstar: 0.0,
            inclination_deg: 53.0,
            raan_deg: 10.0,
            eccentricity: 0.0001,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 45.0,
            mean_motion_rev_day: 15.06,
        }
    }

    #[test]
    fn test_radius_matches_semi_major_axis() {
        let tle = starlink_like();
        let at = Epoch::from_utc(2026, 1, 27, 12, 5, 0).unwrap();
        let p = J2Propagator.propagate(&tle, &at).unwrap();
        let r_km = (p.x.powi(2) + p.y.powi(2) + p.z.powi(2)).sqrt() / 1000.0;
        assert_relative_eq!(r_km, tle.semi_major_axis(), epsilon = 2.0);
        assert!(r_km - R_EARTH > 500.0 && r_km - R_EARTH < 600.0);
    }

    #[test]
    fn test_deterministic() {
        let tle = starlink_like();
        let at = Epoch::from_utc(2026, 1, 27, 12, 9, 59).unwrap();
        assert_eq!(J2Propagator.propagate(&tle, &at), J2Propagator.propagate(&tle, &at));
    }

    #[test]
    fn test_unbound_elements_are_unresolvable() {
        let mut tle = starlink_like();
        tle.mean_motion_rev_day = 0.0;
        let at = Epoch::from_utc(2026, 1, 27, 12, 0, 0).unwrap();
        assert_eq!(
            J2Propagator.propagate(&tle, &at),
            Err(PropagationError::Unresolvable("STARLINK-TEST".to_string()))
        );
    }
}
