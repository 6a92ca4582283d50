//! Trajectory sampling on a uniform time grid.
//!
//! Each node is sampled independently (in parallel across nodes, in time order
//! within a node) and the per-node series are then interleaved so the output
//! is ordered by `time_ms`, then by selection order. Coordinates are rounded
//! to centimeters; the result is a pure function of (node, instant).

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::constants::*;
use crate::epoch::Epoch;
use crate::error::GenerationError;
use crate::fleet::{AerialNode, Fleet, GROUND_SENTINEL, RELAY_DISPLACEMENT_M};
use crate::frames::{round_to, EcefPosition};
use crate::profile::{NodeType, Role};
use crate::propagator::{FrameConverter, GeodeticConverter, PropagationError, Propagator};
use crate::record::{SatRecord, TraceRow, UavRecord};
use crate::selector::{node_id, SelectedNode};

/// Orbital nodes further than this from the Earth's centre are rejected (km).
pub const MAX_ORBITAL_RADIUS_KM: f64 = 7000.0;

/// Sampled instants `0, step, ..., duration - step` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    pub duration_ms: u64,
    pub step_ms: u64,
}

impl TimeGrid {
    pub fn new(duration_ms: u64, step_ms: u64) -> Self {
        Self { duration_ms, step_ms }
    }

    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self::new(config.duration_ms, config.step_ms)
    }

    pub fn steps(&self) -> u64 {
        if self.step_ms == 0 {
            0
        } else {
            self.duration_ms / self.step_ms
        }
    }

    pub fn times(&self) -> impl Iterator<Item = u64> {
        let step = self.step_ms;
        (0..self.steps()).map(move |k| k * step)
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.step_ms != 0 && time_ms < self.steps() * self.step_ms && time_ms % self.step_ms == 0
    }
}

/// Sample every selected orbital node at every grid instant.
pub fn sample_orbital<P, F, G>(
    nodes: &[SelectedNode<'_, P::Handle>],
    propagator: &P,
    frames: &F,
    geodetic: &G,
    epoch: &Epoch,
    grid: TimeGrid,
) -> Result<Vec<SatRecord>, PropagationError>
where
    P: Propagator,
    F: FrameConverter,
    G: GeodeticConverter,
{
    let per_node = nodes
        .par_iter()
        .map(|node| {
            grid.times()
                .map(|time_ms| {
                    let at = epoch.add_millis(time_ms);
                    let eci = propagator.propagate(node.handle, &at)?;
                    let ecef = frames.to_earth_fixed(&eci, &at).round_cm();
                    if !ecef.is_finite() {
                        return Err(PropagationError::NonFinite {
                            node: node.name.clone(),
                            at,
                        });
                    }
                    let altitude_m = geodetic.to_geodetic(&ecef).alt_m;

                    Ok(SatRecord {
                        time_ms,
                        node_id: node.node_id.clone(),
                        name: node.name.clone(),
                        node_type: NodeType::Sat,
                        ecef_x: ecef.x,
                        ecef_y: ecef.y,
                        ecef_z: ecef.z,
                        altitude_km: round_to(altitude_m / 1000.0, 2),
                        orbit_id: node.orbit_id,
                        ip: node.ip.clone(),
                        radius_km: round_to(ecef.norm() / 1000.0, 3),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows = interleave(per_node);
    info!(nodes = nodes.len(), steps = grid.steps(), rows = rows.len(), "orbital trace sampled");
    Ok(rows)
}

/// Sample a ground+aerial fleet. The ground station is `GS_01` at
/// `<prefix>1`; aerial node `k` is `UAV_k` at `<prefix>(k+1)`.
pub fn sample_fleet(fleet: &Fleet, grid: TimeGrid, address_prefix: &str) -> Vec<UavRecord> {
    let gs_position = fleet.ground_station.position().round_cm();
    let ground: Vec<UavRecord> = grid
        .times()
        .map(|time_ms| UavRecord {
            time_ms,
            node_id: node_id("GS", 1, 1),
            role: Role::Anchor,
            node_type: NodeType::Gs,
            ecef_x: gs_position.x,
            ecef_y: gs_position.y,
            ecef_z: gs_position.z,
            ip: format!("{address_prefix}1"),
            heading_deg: GROUND_SENTINEL,
            battery_pct: GROUND_SENTINEL,
        })
        .collect();

    let count = fleet.aerial.len();
    let aerial: Vec<Vec<UavRecord>> = fleet
        .aerial
        .par_iter()
        .enumerate()
        .map(|(i, node)| {
            let id = node_id("UAV", i + 1, count);
            let ip = format!("{}{}", address_prefix, i + 2);
            sample_aerial(node, &id, &ip, grid)
        })
        .collect();

    let mut per_node = Vec::with_capacity(count + 1);
    per_node.push(ground);
    per_node.extend(aerial);

    let rows = interleave(per_node);
    info!(nodes = count + 1, steps = grid.steps(), rows = rows.len(), "fleet trace sampled");
    rows
}

fn sample_aerial(node: &AerialNode, id: &str, ip: &str, grid: TimeGrid) -> Vec<UavRecord> {
    let mut previous: Option<EcefPosition> = None;
    grid.times()
        .map(|time_ms| {
            let t_s = time_ms as f64 / MS_PER_SEC as f64;
            let position = node.position(t_s).round_cm();
            let moving = previous.map_or(false, |p| p.distance_to(&position) > RELAY_DISPLACEMENT_M);
            previous = Some(position);

            UavRecord {
                time_ms,
                node_id: id.to_string(),
                role: if moving { Role::Relay } else { node.base_role },
                node_type: NodeType::Uav,
                ecef_x: position.x,
                ecef_y: position.y,
                ecef_z: position.z,
                ip: ip.to_string(),
                heading_deg: node.heading_deg(t_s),
                battery_pct: node.battery_pct(t_s),
            }
        })
        .collect()
}

/// Merge equal-length per-node series into time-major order.
fn interleave<R>(per_node: Vec<Vec<R>>) -> Vec<R> {
    let total = per_node.iter().map(Vec::len).sum();
    let mut series: Vec<_> = per_node.into_iter().map(Vec::into_iter).collect();
    let mut rows = Vec::with_capacity(total);
    while rows.len() < total {
        for s in series.iter_mut() {
            if let Some(row) = s.next() {
                rows.push(row);
            }
        }
    }
    rows
}

/// Check a full trace before anything is written: every grid instant present
/// in ascending order with exactly `node_count` rows, ids and addresses
/// filled in, coordinates finite and, when given, within `max_radius_km` of
/// the Earth's centre.
pub fn check_structure<R: TraceRow>(
    rows: &[R],
    grid: TimeGrid,
    node_count: usize,
    max_radius_km: Option<f64>,
) -> Result<(), GenerationError> {
    if rows.is_empty() {
        return Err(GenerationError::EmptyTrace);
    }

    let mut per_time: BTreeMap<u64, usize> = BTreeMap::new();
    let mut last_time = 0;
    for row in rows {
        let time_ms = row.time_ms();
        if time_ms < last_time {
            return Err(GenerationError::Unordered { time_ms });
        }
        last_time = time_ms;

        if !grid.contains(time_ms) {
            return Err(GenerationError::OffGrid {
                time_ms,
                step_ms: grid.step_ms,
            });
        }
        if row.node_id().is_empty() {
            return Err(GenerationError::MissingField {
                time_ms,
                field: "node_id",
            });
        }
        if row.address().is_empty() {
            return Err(GenerationError::MissingField { time_ms, field: "ip" });
        }

        let position = row.position();
        if !position.is_finite() {
            return Err(GenerationError::NonFinite {
                node_id: row.node_id().to_string(),
                time_ms,
            });
        }
        if let Some(limit_km) = max_radius_km {
            let radius_km = position.norm() / 1000.0;
            if radius_km > limit_km {
                return Err(GenerationError::Radius {
                    node_id: row.node_id().to_string(),
                    time_ms,
                    radius_km,
                    limit_km,
                });
            }
        }

        *per_time.entry(time_ms).or_default() += 1;
    }

    for time_ms in grid.times() {
        match per_time.get(&time_ms) {
            None => return Err(GenerationError::MissingTimestamp { time_ms }),
            Some(&found) if found != node_count => {
                return Err(GenerationError::RowCount {
                    time_ms,
                    found,
                    expected: node_count,
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogNode};
    use crate::frames::{EciPosition, Wgs84};
    use crate::selector::select_visible;

    /// Circular equatorial-plane orbit in the inertial frame, phase per node.
    struct RingPropagator {
        epoch: Epoch,
    }

    impl Propagator for RingPropagator {
        type Handle = f64;

        fn propagate(&self, phase_deg: &f64, at: &Epoch) -> Result<EciPosition, PropagationError> {
            let r = (R_EARTH + 550.0) * 1000.0;
            let n = (MU_EARTH / (r / 1000.0).powi(3)).sqrt();
            let angle = phase_deg * DEG2RAD + n * at.seconds_since(&self.epoch);
            Ok(EciPosition::new(r * angle.cos(), r * angle.sin(), 0.0))
        }
    }

    struct Failing;

    impl Propagator for Failing {
        type Handle = f64;

        fn propagate(&self, _: &f64, at: &Epoch) -> Result<EciPosition, PropagationError> {
            if at.seconds_since(&ScenarioConfig::default().epoch) > 5.0 {
                Err(PropagationError::Unresolvable("late".into()))
            } else {
                Ok(EciPosition::new(7.0e6, 0.0, 0.0))
            }
        }
    }

    fn ring_catalog() -> Catalog<f64> {
        Catalog::new(
            (0..4)
                .map(|i| CatalogNode {
                    id: i,
                    name: format!("RING-{i}"),
                    handle: i as f64 * 0.5,
                })
                .collect(),
        )
    }

    fn config() -> ScenarioConfig {
        ScenarioConfig {
            duration_ms: 10_000,
            chunk_duration_ms: 5_000,
            // Equatorial ring: select by range alone, whatever the geometry.
            max_range_km: 1.0e6,
            ..ScenarioConfig::default()
        }
    }

    fn sampled() -> Vec<SatRecord> {
        let cfg = config();
        let cat = ring_catalog();
        let prop = RingPropagator { epoch: cfg.epoch };
        let nodes = select_visible(&cat, &prop, &Wgs84, &cfg).unwrap();
        sample_orbital(&nodes, &prop, &Wgs84, &Wgs84, &cfg.epoch, TimeGrid::from_config(&cfg)).unwrap()
    }

    #[test]
    fn test_grid() {
        let grid = TimeGrid::new(600_000, 100);
        assert_eq!(grid.steps(), 6000);
        assert_eq!(grid.times().last(), Some(599_900));
        assert!(grid.contains(599_900));
        assert!(!grid.contains(600_000));
        assert!(!grid.contains(150));
    }

    #[test]
    fn test_dense_time_major_order() {
        let rows = sampled();
        assert_eq!(rows.len(), 40);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.time_ms, (i / 4) as u64 * 1000);
        }
        let first: Vec<_> = rows[..4].iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(first, ["SAT_01", "SAT_02", "SAT_03", "SAT_04"]);
        check_structure(&rows, TimeGrid::from_config(&config()), 4, Some(MAX_ORBITAL_RADIUS_KM)).unwrap();
    }

    #[test]
    fn test_rounding_and_derived_fields() {
        for row in sampled() {
            assert_eq!(row.ecef_x, round_to(row.ecef_x, 2));
            assert_eq!(row.altitude_km, round_to(row.altitude_km, 2));
            assert!(row.altitude_km > 500.0 && row.altitude_km < 600.0);
            assert!(row.radius_km > 6900.0 && row.radius_km < 6950.0);
            assert_eq!(row.orbit_id, -1);
            assert_eq!(row.node_type, NodeType::Sat);
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sampled(), sampled());
    }

    #[test]
    fn test_propagation_failure_is_fatal() {
        let cfg = config();
        let cat = ring_catalog();
        let nodes = select_visible(&cat, &Failing, &Wgs84, &cfg).unwrap();
        let err = sample_orbital(&nodes, &Failing, &Wgs84, &Wgs84, &cfg.epoch, TimeGrid::from_config(&cfg));
        assert!(matches!(err, Err(PropagationError::Unresolvable(_))));
    }

    #[test]
    fn test_fleet_rows() {
        let grid = TimeGrid::new(60_000, 100);
        let rows = sample_fleet(&Fleet::reference(), grid, "10.0.0.");
        assert_eq!(rows.len(), 2400);
        check_structure(&rows, grid, 4, None).unwrap();

        let ids: Vec<_> = rows[..4].iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, ["GS_01", "UAV_01", "UAV_02", "UAV_03"]);
        assert_eq!(rows[0].ip, "10.0.0.1");
        assert_eq!(rows[3].ip, "10.0.0.4");

        let gs: Vec<_> = rows.iter().filter(|r| r.node_type == NodeType::Gs).collect();
        assert!(gs.iter().all(|r| r.ecef_x == gs[0].ecef_x && r.heading_deg == -1.0 && r.battery_pct == -1.0));

        // Fast circler relays after its first sample, the others never do.
        let roles = |id: &str| -> Vec<Role> {
            rows.iter().filter(|r| r.node_id == id).map(|r| r.role).collect()
        };
        let fast = roles("UAV_01");
        assert_eq!(fast[0], Role::Scout);
        assert!(fast[1..].iter().all(|r| *r == Role::Relay));
        assert!(roles("UAV_02").iter().all(|r| *r == Role::Scout));
        assert!(roles("UAV_03").iter().all(|r| *r == Role::Scout));
    }

    #[test]
    fn test_structure_row_count() {
        let mut rows = sampled();
        rows.remove(5);
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, None).unwrap_err();
        assert!(matches!(err, GenerationError::RowCount { time_ms: 1000, found: 3, expected: 4 }));
    }

    #[test]
    fn test_structure_missing_timestamp() {
        let rows: Vec<_> = sampled().into_iter().filter(|r| r.time_ms != 9000).collect();
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, None).unwrap_err();
        assert!(matches!(err, GenerationError::MissingTimestamp { time_ms: 9000 }));
    }

    #[test]
    fn test_structure_radius_limit() {
        let rows = sampled();
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, Some(6500.0)).unwrap_err();
        assert!(matches!(err, GenerationError::Radius { .. }));
    }

    #[test]
    fn test_structure_non_finite() {
        let mut rows = sampled();
        rows[7].ecef_z = f64::NAN;
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, None).unwrap_err();
        assert!(matches!(err, GenerationError::NonFinite { time_ms: 1000, .. }));
    }

    #[test]
    fn test_structure_off_grid() {
        let mut rows = sampled();
        let n = rows.len();
        rows[n - 1].time_ms = 9_500;
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, None).unwrap_err();
        assert!(matches!(err, GenerationError::OffGrid { time_ms: 9_500, .. }));
    }

    #[test]
    fn test_structure_missing_address() {
        let mut rows = sampled();
        rows[2].ip.clear();
        let err = check_structure(&rows, TimeGrid::from_config(&config()), 4, None).unwrap_err();
        assert!(matches!(err, GenerationError::MissingField { time_ms: 0, field: "ip" }));
    }
}
