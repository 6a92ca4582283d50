//! Mean orbital elements with J2 secular drift.
//!
//! Elements are referenced to their own epoch; [`MeanElements::drifted`]
//! advances them by an elapsed time and [`MeanElements::position_km`]
//! places the node in the inertial frame.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::epoch::Epoch;

/// Mean Keplerian elements at a reference epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanElements {
    /// Mean semi-major axis (km)
    pub a: f64,
    /// Mean eccentricity
    pub e: f64,
    /// Mean inclination (rad)
    pub i: f64,
    /// Mean RAAN (rad)
    pub raan: f64,
    /// Mean argument of perigee (rad)
    pub aop: f64,
    /// Mean anomaly (rad)
    pub ma: f64,
    /// Reference epoch
    pub epoch: Epoch,
}

impl MeanElements {
    /// Build from values in degrees (convenience constructor).
    pub fn from_degrees(
        a: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ma_deg: f64,
        epoch: Epoch,
    ) -> Self {
        Self {
            a,
            e,
            i: i_deg * DEG2RAD,
            raan: raan_deg * DEG2RAD,
            aop: aop_deg * DEG2RAD,
            ma: ma_deg * DEG2RAD,
            epoch,
        }
    }

    /// Whether these elements describe a closed orbit above the Earth's centre.
    pub fn is_bound(&self) -> bool {
        self.a.is_finite() && self.a > 0.0 && (0.0..1.0).contains(&self.e)
    }

    /// Unperturbed mean motion (rad/s).
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.a.powi(3)).sqrt()
    }

    /// J2 secular drift rate of RAAN (rad/s).
    ///
    /// dΩ/dt = -3/2 * n * J2 * (R_E/p)² * cos(i)
    pub fn raan_rate(&self) -> f64 {
        let p = self.a * (1.0 - self.e.powi(2));
        -1.5 * self.mean_motion() * J2 * (R_EARTH / p).powi(2) * self.i.cos()
    }

    /// J2 secular drift rate of argument of perigee (rad/s).
    ///
    /// dω/dt = 3/2 * n * J2 * (R_E/p)² * (2 - 5/2 sin²i)
    pub fn aop_rate(&self) -> f64 {
        let p = self.a * (1.0 - self.e.powi(2));
        1.5 * self.mean_motion() * J2 * (R_EARTH / p).powi(2) * (2.0 - 2.5 * self.i.sin().powi(2))
    }

    /// J2-perturbed mean motion (rad/s).
    pub fn mean_motion_j2(&self) -> f64 {
        let eta = (1.0 - self.e.powi(2)).sqrt();
        let ratio = R_EARTH / self.a;
        self.mean_motion()
            * (1.0 + 1.5 * J2 * ratio.powi(2) * (1.0 - 1.5 * self.i.sin().powi(2)) / eta.powi(3))
    }

    /// Elements advanced by `dt` seconds under J2 secular drift only.
    ///
    /// The epoch field is left at the original reference; callers track the
    /// target instant themselves.
    pub fn drifted(&self, dt: f64) -> MeanElements {
        MeanElements {
            raan: normalize_angle(self.raan + self.raan_rate() * dt),
            aop: normalize_angle(self.aop + self.aop_rate() * dt),
            ma: normalize_angle(self.ma + self.mean_motion_j2() * dt),
            ..*self
        }
    }

    /// Inertial position (km) described by these elements.
    pub fn position_km(&self) -> [f64; 3] {
        let nu = mean_to_true_anomaly(self.ma, self.e, 1e-12, 50);
        let p = self.a * (1.0 - self.e.powi(2));
        let r = p / (1.0 + self.e * nu.cos());
        let (px, py) = (r * nu.cos(), r * nu.sin());

        let (sin_raan, cos_raan) = self.raan.sin_cos();
        let (sin_aop, cos_aop) = self.aop.sin_cos();
        let (sin_i, cos_i) = self.i.sin_cos();

        // Perifocal (PQW) → inertial
        [
            (cos_raan * cos_aop - sin_raan * sin_aop * cos_i) * px
                + (-cos_raan * sin_aop - sin_raan * cos_aop * cos_i) * py,
            (sin_raan * cos_aop + cos_raan * sin_aop * cos_i) * px
                + (-sin_raan * sin_aop + cos_raan * cos_aop * cos_i) * py,
            sin_aop * sin_i * px + cos_aop * sin_i * py,
        ]
    }
}

/// Normalize angle to [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Solve Kepler's equation M = E - e sin(E) for eccentric anomaly (Newton-Raphson).
fn mean_to_eccentric_anomaly(m: f64, e: f64, tol: f64, max_iter: usize) -> f64 {
    let mut ea = if e < 0.8 { m } else { std::f64::consts::PI };

    for _ in 0..max_iter {
        let delta = (ea - e * ea.sin() - m) / (1.0 - e * ea.cos());
        ea -= delta;
        if delta.abs() < tol {
            break;
        }
    }
    ea
}

/// Convert mean anomaly to true anomaly.
fn mean_to_true_anomaly(m: f64, e: f64, tol: f64, max_iter: usize) -> f64 {
    let ea = mean_to_eccentric_anomaly(m, e, tol, max_iter);
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}
