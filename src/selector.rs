//! Visibility selection.
//!
//! Every catalog node is placed at the reference epoch and looked at from the
//! observer. A node qualifies when it is above the elevation mask **or**
//! closer than the range limit; proximity alone is enough, even below the
//! horizon. Qualifying nodes are ordered by slant range (stable, so ties keep
//! catalog order), truncated to `max_nodes`, and numbered in that order.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::ScenarioConfig;
use crate::frames::look_angle;
use crate::propagator::{FrameConverter, PropagationError, Propagator};

/// Placeholder group identifier written for every orbital node.
pub const UNASSIGNED_ORBIT: i32 = -1;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("none of the {candidates} catalog nodes could be propagated (last error: {last})")]
    NoneResolvable {
        candidates: usize,
        last: PropagationError,
    },
}

/// A catalog node admitted into the scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedNode<'a, H> {
    /// Scenario-scoped id, e.g. `SAT_07`.
    pub node_id: String,
    pub name: String,
    pub catalog_id: u32,
    pub ip: String,
    pub orbit_id: i32,
    pub handle: &'a H,
    /// Slant range from the observer at the epoch (km).
    pub range_km: f64,
    pub elevation_deg: f64,
}

struct Candidate<'a, H> {
    index: usize,
    handle: &'a H,
    range_km: f64,
    elevation_deg: f64,
}

/// Scenario node id with the index zero-padded to at least two digits, or
/// wider when `count` needs it, so lexical order matches numeric order.
pub fn node_id(prefix: &str, index: usize, count: usize) -> String {
    let width = count.to_string().len().max(2);
    format!("{prefix}_{index:0width$}")
}

/// Pick at most `config.max_nodes` catalog nodes visible from the observer.
///
/// Fewer qualifying nodes than requested is not an error. Nodes whose handle
/// cannot be propagated are skipped; if that leaves no candidate at all the
/// selection fails.
pub fn select_visible<'a, P, F>(
    catalog: &'a Catalog<P::Handle>,
    propagator: &P,
    frames: &F,
    config: &ScenarioConfig,
) -> Result<Vec<SelectedNode<'a, P::Handle>>, SelectionError>
where
    P: Propagator,
    F: FrameConverter,
{
    if catalog.is_empty() {
        return Err(SelectionError::EmptyCatalog);
    }

    let observer = config.observer.geodetic();
    let mut resolved = 0usize;
    let mut last_error = None;
    let mut qualifying = Vec::new();

    for (index, node) in catalog.nodes().iter().enumerate() {
        let eci = match propagator.propagate(&node.handle, &config.epoch) {
            Ok(p) => p,
            Err(e) => {
                warn!(node = %node.name, error = %e, "skipping unpropagatable catalog node");
                last_error = Some(e);
                continue;
            }
        };
        resolved += 1;

        let ecef = frames.to_earth_fixed(&eci, &config.epoch);
        let look = look_angle(&observer, &ecef);
        let range_km = look.range_m / 1000.0;

        if look.elevation_deg > config.min_elevation_deg || range_km < config.max_range_km {
            debug!(
                node = %node.name,
                elevation_deg = look.elevation_deg,
                range_km,
                "candidate qualifies"
            );
            qualifying.push(Candidate {
                index,
                handle: &node.handle,
                range_km,
                elevation_deg: look.elevation_deg,
            });
        }
    }

    if resolved == 0 {
        if let Some(last) = last_error {
            return Err(SelectionError::NoneResolvable {
                candidates: catalog.len(),
                last,
            });
        }
    }

    let found = qualifying.len();
    qualifying.sort_by(|a, b| a.range_km.total_cmp(&b.range_km));
    qualifying.truncate(config.max_nodes);

    if found < config.max_nodes {
        warn!(
            qualifying = found,
            requested = config.max_nodes,
            "fewer nodes qualify than requested; selecting all of them"
        );
    }

    let count = qualifying.len();
    let selected: Vec<_> = qualifying
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let seq = i + 1;
            let node = &catalog.nodes()[c.index];
            SelectedNode {
                node_id: node_id("SAT", seq, count),
                name: node.name.clone(),
                catalog_id: node.id,
                ip: format!("{}{}", config.address_prefix, seq),
                orbit_id: UNASSIGNED_ORBIT,
                handle: c.handle,
                range_km: c.range_km,
                elevation_deg: c.elevation_deg,
            }
        })
        .collect();

    info!(
        catalog = catalog.len(),
        qualifying = found,
        selected = selected.len(),
        "visibility selection complete"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogNode;
    use crate::epoch::Epoch;
    use crate::frames::{geodetic_to_ecef, EcefPosition, EciPosition, Geodetic};

    /// Handles are fixed Earth-fixed positions; the frame rotation is identity.
    struct FixedPropagator;

    impl Propagator for FixedPropagator {
        type Handle = Option<EcefPosition>;

        fn propagate(&self, handle: &Self::Handle, _at: &Epoch) -> Result<EciPosition, PropagationError> {
            handle
                .map(|p| EciPosition::new(p.x, p.y, p.z))
                .ok_or_else(|| PropagationError::Unresolvable("fixed".into()))
        }
    }

    struct Identity;

    impl FrameConverter for Identity {
        fn to_earth_fixed(&self, p: &EciPosition, _at: &Epoch) -> EcefPosition {
            EcefPosition::new(p.x, p.y, p.z)
        }
    }

    fn overhead(alt_km: f64) -> Option<EcefPosition> {
        Some(geodetic_to_ecef(&Geodetic::new(30.0, 104.0, alt_km * 1000.0)))
    }

    fn catalog(handles: Vec<Option<EcefPosition>>) -> Catalog<Option<EcefPosition>> {
        Catalog::new(
            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| CatalogNode {
                    id: 1000 + i as u32,
                    name: format!("STARLINK-{i}"),
                    handle,
                })
                .collect(),
        )
    }

    #[test]
    fn test_sorted_by_range_and_truncated() {
        let cat = catalog(vec![overhead(900.0), overhead(500.0), overhead(700.0), overhead(600.0)]);
        let cfg = ScenarioConfig { max_nodes: 3, ..ScenarioConfig::default() };
        let sel = select_visible(&cat, &FixedPropagator, &Identity, &cfg).unwrap();

        let names: Vec<_> = sel.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["STARLINK-1", "STARLINK-3", "STARLINK-2"]);
        assert_eq!(sel[0].node_id, "SAT_01");
        assert_eq!(sel[2].ip, "10.0.3.3");
        assert_eq!(sel[1].orbit_id, UNASSIGNED_ORBIT);
        assert!(sel.windows(2).all(|w| w[0].range_km <= w[1].range_km));
    }

    #[test]
    fn test_fewer_than_requested_is_ok() {
        let cat = catalog(vec![overhead(550.0), overhead(560.0)]);
        let sel = select_visible(&cat, &FixedPropagator, &Identity, &ScenarioConfig::default()).unwrap();
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_proximity_alone_qualifies() {
        // Far side of the Earth: below the horizon and out of range.
        let far = Some(geodetic_to_ecef(&Geodetic::new(-30.0, -76.0, 550_000.0)));
        // On the ground 14° of longitude away: below the horizon, within range.
        let near = Some(geodetic_to_ecef(&Geodetic::new(30.0, 118.0, 0.0)));
        let cat = catalog(vec![far, near]);
        let cfg = ScenarioConfig::default();
        let sel = select_visible(&cat, &FixedPropagator, &Identity, &cfg).unwrap();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel[0].name, "STARLINK-1");
        assert!(sel[0].elevation_deg < 0.0);
        assert!(sel[0].range_km < cfg.max_range_km);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let cat = catalog(vec![overhead(550.0), overhead(550.0), overhead(550.0)]);
        let sel = select_visible(&cat, &FixedPropagator, &Identity, &ScenarioConfig::default()).unwrap();
        let ids: Vec<_> = sel.iter().map(|n| n.catalog_id).collect();
        assert_eq!(ids, [1000, 1001, 1002]);
    }

    #[test]
    fn test_unresolvable_nodes_skipped() {
        let cat = catalog(vec![None, overhead(550.0)]);
        let sel = select_visible(&cat, &FixedPropagator, &Identity, &ScenarioConfig::default()).unwrap();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel[0].node_id, "SAT_01");
    }

    #[test]
    fn test_all_unresolvable_is_fatal() {
        let cat = catalog(vec![None, None]);
        let err = select_visible(&cat, &FixedPropagator, &Identity, &ScenarioConfig::default()).unwrap_err();
        assert!(matches!(err, SelectionError::NoneResolvable { candidates: 2, .. }));
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let cat = catalog(vec![]);
        let err = select_visible(&cat, &FixedPropagator, &Identity, &ScenarioConfig::default()).unwrap_err();
        assert!(matches!(err, SelectionError::EmptyCatalog));
    }

    #[test]
    fn test_node_id_width() {
        assert_eq!(node_id("SAT", 7, 50), "SAT_07");
        assert_eq!(node_id("SAT", 7, 120), "SAT_007");
        assert_eq!(node_id("UAV", 1, 3), "UAV_01");
    }
}
