//! Ground+aerial scenario description.
//!
//! A fleet is one fixed ground station plus aerial nodes, each following a
//! [`MotionPlan`] expressed in the local East-North-Up frame of its anchor
//! point. Motion is evaluated directly in the Earth-fixed frame, so a
//! stationary node has bit-identical coordinates at every instant.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::frames::{enu_to_ecef_offset, geodetic_to_ecef, round_to, EcefPosition, Geodetic};
use crate::profile::Role;

/// Per-sample displacement above which an aerial node counts as relaying (m).
pub const RELAY_DISPLACEMENT_M: f64 = 5.0;

/// Heading and battery value written for ground nodes.
pub const GROUND_SENTINEL: f64 = -1.0;

/// Kinematic model of an aerial node, relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionPlan {
    /// Holds position over the anchor.
    Hover,
    /// Constant ENU velocity starting at the anchor.
    Linear { velocity_enu_mps: [f64; 3] },
    /// Counter-clockwise circle (seen from above) centred on the anchor.
    Circle {
        radius_m: f64,
        speed_mps: f64,
        phase_deg: f64,
    },
}

impl MotionPlan {
    /// ENU offset from the anchor at `t_s` seconds (m).
    pub fn offset_enu(&self, t_s: f64) -> [f64; 3] {
        match *self {
            MotionPlan::Hover => [0.0; 3],
            MotionPlan::Linear { velocity_enu_mps: v } => [v[0] * t_s, v[1] * t_s, v[2] * t_s],
            MotionPlan::Circle {
                radius_m,
                speed_mps,
                phase_deg,
            } => {
                let (s, c) = circle_angle(radius_m, speed_mps, phase_deg, t_s).sin_cos();
                [radius_m * c, radius_m * s, 0.0]
            }
        }
    }

    /// ENU velocity at `t_s` seconds (m/s).
    pub fn velocity_enu(&self, t_s: f64) -> [f64; 3] {
        match *self {
            MotionPlan::Hover => [0.0; 3],
            MotionPlan::Linear { velocity_enu_mps } => velocity_enu_mps,
            MotionPlan::Circle {
                radius_m,
                speed_mps,
                phase_deg,
            } => {
                let (s, c) = circle_angle(radius_m, speed_mps, phase_deg, t_s).sin_cos();
                [-speed_mps * s, speed_mps * c, 0.0]
            }
        }
    }
}

fn circle_angle(radius_m: f64, speed_mps: f64, phase_deg: f64, t_s: f64) -> f64 {
    let omega = if radius_m > 0.0 { speed_mps / radius_m } else { 0.0 };
    phase_deg * DEG2RAD + omega * t_s
}

/// Fixed ground node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub site: Geodetic,
}

impl GroundStation {
    pub fn position(&self) -> EcefPosition {
        geodetic_to_ecef(&self.site)
    }
}

/// Aerial node and its mission profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AerialNode {
    pub anchor: Geodetic,
    pub plan: MotionPlan,
    /// Role reported while not relaying.
    pub base_role: Role,
    pub battery_start_pct: f64,
    pub battery_drain_pct_per_s: f64,
}

impl AerialNode {
    pub fn position(&self, t_s: f64) -> EcefPosition {
        let origin = geodetic_to_ecef(&self.anchor);
        let d = enu_to_ecef_offset(&self.anchor, self.plan.offset_enu(t_s));
        EcefPosition::new(origin.x + d[0], origin.y + d[1], origin.z + d[2])
    }

    /// Course over ground, clockwise from north, rounded to 0.01° in [0, 360).
    pub fn heading_deg(&self, t_s: f64) -> f64 {
        let [east, north, _] = self.plan.velocity_enu(t_s);
        normalize_heading(east.atan2(north) * RAD2DEG)
    }

    /// Linear drain, clamped at empty, rounded to 0.01 %.
    pub fn battery_pct(&self, t_s: f64) -> f64 {
        round_to((self.battery_start_pct - self.battery_drain_pct_per_s * t_s).max(0.0), 2)
    }
}

/// Wrap into [0, 360) after rounding to 0.01°.
pub fn normalize_heading(deg: f64) -> f64 {
    // + 0.0 clears a negative zero
    let h = round_to(deg.rem_euclid(360.0), 2) + 0.0;
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// One ground station plus its aerial nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub ground_station: GroundStation,
    pub aerial: Vec<AerialNode>,
}

impl Fleet {
    /// Rows per timestamp.
    pub fn group_size(&self) -> usize {
        1 + self.aerial.len()
    }

    /// Ground station near Chengdu with three aerial nodes at 1500 m: a fast
    /// circling relay, a slow circling scout and a hovering scout.
    pub fn reference() -> Self {
        let cruise = |lat_deg, lon_deg| Geodetic::new(lat_deg, lon_deg, 1500.0);
        Self {
            ground_station: GroundStation {
                site: Geodetic::new(30.0, 104.0, 500.0),
            },
            aerial: vec![
                AerialNode {
                    anchor: cruise(30.01, 104.01),
                    plan: MotionPlan::Circle {
                        radius_m: 1500.0,
                        speed_mps: 60.0,
                        phase_deg: 0.0,
                    },
                    base_role: Role::Scout,
                    battery_start_pct: 100.0,
                    battery_drain_pct_per_s: 0.02,
                },
                AerialNode {
                    anchor: cruise(29.99, 103.99),
                    plan: MotionPlan::Circle {
                        radius_m: 800.0,
                        speed_mps: 20.0,
                        phase_deg: 90.0,
                    },
                    base_role: Role::Scout,
                    battery_start_pct: 95.0,
                    battery_drain_pct_per_s: 0.01,
                },
                AerialNode {
                    anchor: cruise(30.0, 104.02),
                    plan: MotionPlan::Hover,
                    base_role: Role::Scout,
                    battery_start_pct: 90.0,
                    battery_drain_pct_per_s: 0.005,
                },
            ],
        }
    }
}
