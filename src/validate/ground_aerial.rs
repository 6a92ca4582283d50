//! Ground+aerial-profile validator.
//!
//! Beyond the shared structure rules, positions are converted back to
//! geodetic coordinates and checked per node type, and each node's samples
//! are walked in time order for battery drain and relay-role consistency.

use std::collections::BTreeMap;
use std::path::Path;

use super::rules;
use super::{file_name, into_verdict, Bounds, Finding, Rule, TraceTable, Verdict, Violation, MAX_SAMPLES};
use crate::config::ScenarioConfig;
use crate::constants::{MEAN_EARTH_RADIUS_KM, MS_PER_SEC};
use crate::fleet::{GROUND_SENTINEL, RELAY_DISPLACEMENT_M};
use crate::frames::{EcefPosition, Geodetic};
use crate::profile::{NodeType, Profile, Role};
use crate::propagator::GeodeticConverter;
use crate::record::{TraceRow, UavRecord};

/// Battery-rate samples kept in a FAIL reason.
const MAX_RATE_SAMPLES: usize = 5;

/// Limits for ground+aerial chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundAerialRules {
    /// Rows per timestamp: one ground node plus the aerial nodes.
    pub group_size: usize,
    pub step_ms: u64,
    pub timestamps_per_chunk: usize,
    pub radius_km: Bounds,
    pub latitude_deg: Bounds,
    pub longitude_deg: Bounds,
    pub uav_altitude_m: Bounds,
    pub gs_max_altitude_m: f64,
    /// Heading and battery value required on ground nodes.
    pub sentinel: f64,
    pub max_battery_rate_pct_per_s: f64,
    pub relay_displacement_m: f64,
    pub address_prefix: String,
}

impl Default for GroundAerialRules {
    fn default() -> Self {
        Self {
            group_size: 4,
            step_ms: Profile::GroundAerial.step_ms(),
            timestamps_per_chunk: 600,
            radius_km: Bounds::new(MEAN_EARTH_RADIUS_KM, 7000.0),
            latitude_deg: Bounds::new(29.0, 31.0),
            longitude_deg: Bounds::new(103.0, 105.0),
            uav_altitude_m: Bounds::new(500.0, 5000.0),
            gs_max_altitude_m: 1000.0,
            sentinel: GROUND_SENTINEL,
            max_battery_rate_pct_per_s: 10.0,
            relay_displacement_m: RELAY_DISPLACEMENT_M,
            address_prefix: Profile::GroundAerial.address_prefix().to_string(),
        }
    }
}

impl GroundAerialRules {
    /// Limits matching a generated scenario with `group_size` nodes.
    pub fn for_scenario(config: &ScenarioConfig, group_size: usize) -> Self {
        Self {
            group_size,
            step_ms: config.step_ms,
            timestamps_per_chunk: (config.chunk_duration_ms / config.step_ms.max(1)) as usize,
            address_prefix: config.address_prefix.clone(),
            ..Self::default()
        }
    }

    pub fn total_rows(&self) -> usize {
        self.group_size * self.timestamps_per_chunk
    }
}

/// One row with its derived geodetic position.
struct Sample<'a> {
    time_ms: u64,
    node_id: &'a str,
    role: &'a str,
    is_ground: bool,
    position: EcefPosition,
    geodetic: Geodetic,
    /// As written.
    heading_deg: f64,
    /// Aerial headings folded into `[0, 360)`; ground headings as written.
    heading_norm_deg: f64,
    battery_pct: f64,
}

pub fn validate_ground_aerial<G: GeodeticConverter>(path: &Path, limits: &GroundAerialRules, geodetic: &G) -> Verdict {
    into_verdict(check(path, limits, geodetic))
}

fn check<G: GeodeticConverter>(path: &Path, limits: &GroundAerialRules, geodetic: &G) -> Result<(), Finding> {
    let profile = Profile::GroundAerial;
    rules::filename(&file_name(path), profile)?;

    let table = TraceTable::from_path(path)?;
    rules::columns(&table, profile.columns())?;
    rules::no_nulls(&table)?;

    let times = table.u64s("time_ms")?;
    let node_ids = table.text("node_id")?;
    rules::rows_per_timestamp(&times, limits.group_size)?;
    rules::unique_pairs(&times, &node_ids)?;
    rules::timestamp_count(&times, limits.timestamps_per_chunk)?;
    rules::timestamp_step(&times, limits.step_ms)?;
    if table.len() != limits.total_rows() {
        return Err(Violation::new(
            Rule::RowTotal,
            format!("{} rows, expected {}", table.len(), limits.total_rows()),
        )
        .into());
    }

    let types = table.text("type")?;
    rules::node_types(&types, profile.node_types())?;

    let roles = table.text("role")?;
    let (xs, ys, zs) = (table.f64s("ecef_x")?, table.f64s("ecef_y")?, table.f64s("ecef_z")?);
    let headings = table.f64s("heading_deg")?;
    let batteries = table.f64s("battery_pct")?;

    let samples: Vec<Sample<'_>> = (0..table.len())
        .map(|i| {
            let position = EcefPosition::new(xs[i], ys[i], zs[i]);
            let is_ground = types[i] == NodeType::Gs.tag();
            Sample {
                time_ms: times[i],
                node_id: node_ids[i],
                role: roles[i],
                is_ground,
                position,
                geodetic: geodetic.to_geodetic(&position),
                heading_deg: headings[i],
                heading_norm_deg: if is_ground { headings[i] } else { normalized_heading(headings[i]) },
                battery_pct: batteries[i],
            }
        })
        .collect();

    physics(&samples, limits)?;

    rules::addresses(&table.text("ip")?, &limits.address_prefix)?;
    Ok(())
}

/// Run the per-row and per-node physical rules on rows still in memory, so a
/// generator can refuse to publish a trace the validator would reject.
pub(crate) fn check_records<G: GeodeticConverter>(
    rows: &[UavRecord],
    limits: &GroundAerialRules,
    geodetic: &G,
) -> Result<(), Violation> {
    let samples: Vec<Sample<'_>> = rows
        .iter()
        .map(|r| {
            let position = r.position();
            let is_ground = r.node_type == NodeType::Gs;
            Sample {
                time_ms: r.time_ms,
                node_id: &r.node_id,
                role: r.role.tag(),
                is_ground,
                position,
                geodetic: geodetic.to_geodetic(&position),
                heading_deg: r.heading_deg,
                heading_norm_deg: if is_ground { r.heading_deg } else { normalized_heading(r.heading_deg) },
                battery_pct: r.battery_pct,
            }
        })
        .collect();
    physics(&samples, limits)
}

fn physics(samples: &[Sample<'_>], limits: &GroundAerialRules) -> Result<(), Violation> {
    finite(samples)?;
    positions(samples, limits)?;
    altitudes(samples, limits)?;
    sentinels_and_ranges(samples, limits)?;

    let by_node = tracks(samples);
    battery_rate(&by_node, limits)?;
    relay_role(&by_node, limits)
}

/// Samples grouped per node, in time order.
fn tracks<'s, 'a>(samples: &'s [Sample<'a>]) -> Tracks<'s, 'a> {
    let mut by_node: BTreeMap<&str, Vec<&Sample<'_>>> = BTreeMap::new();
    for s in samples {
        by_node.entry(s.node_id).or_default().push(s);
    }
    for track in by_node.values_mut() {
        track.sort_by_key(|s| s.time_ms);
    }
    by_node
}

fn fail<I: IntoIterator<Item = String>>(rule: Rule, what: &str, offending: I, cap: usize) -> Result<(), Violation> {
    let offending: Vec<String> = offending.into_iter().collect();
    if offending.is_empty() {
        return Ok(());
    }
    Err(Violation::new(rule, format!("{} {what}", offending.len())).with_samples(offending, cap))
}

fn finite(samples: &[Sample<'_>]) -> Result<(), Violation> {
    fail(
        Rule::FiniteCoordinates,
        "rows with non-finite coordinates",
        samples
            .iter()
            .filter(|s| !s.position.is_finite())
            .map(|s| format!("{}@{}ms", s.node_id, s.time_ms)),
        MAX_SAMPLES,
    )
}

fn positions(samples: &[Sample<'_>], limits: &GroundAerialRules) -> Result<(), Violation> {
    fail(
        Rule::Radius,
        &format!("rows with ECEF radius outside {} km", limits.radius_km),
        samples
            .iter()
            .filter(|s| !limits.radius_km.contains(s.position.norm() / 1000.0))
            .map(|s| format!("{}@{}ms: {:.3} km", s.node_id, s.time_ms, s.position.norm() / 1000.0)),
        MAX_SAMPLES,
    )?;
    fail(
        Rule::Area,
        &format!(
            "rows outside lat {} lon {}",
            limits.latitude_deg, limits.longitude_deg
        ),
        samples
            .iter()
            .filter(|s| {
                !limits.latitude_deg.contains(s.geodetic.lat_deg) || !limits.longitude_deg.contains(s.geodetic.lon_deg)
            })
            .map(|s| format!("{}@{}ms: {:.4}, {:.4}", s.node_id, s.time_ms, s.geodetic.lat_deg, s.geodetic.lon_deg)),
        MAX_SAMPLES,
    )
}

fn altitudes(samples: &[Sample<'_>], limits: &GroundAerialRules) -> Result<(), Violation> {
    fail(
        Rule::Altitude,
        &format!("aerial rows with altitude outside {} m", limits.uav_altitude_m),
        samples
            .iter()
            .filter(|s| !s.is_ground && !limits.uav_altitude_m.contains(s.geodetic.alt_m))
            .map(|s| format!("{}@{}ms: {:.2} m", s.node_id, s.time_ms, s.geodetic.alt_m)),
        MAX_SAMPLES,
    )?;
    fail(
        Rule::Altitude,
        &format!("ground rows above {} m", limits.gs_max_altitude_m),
        samples
            .iter()
            // written so NaN fails
            .filter(|s| s.is_ground && !(s.geodetic.alt_m <= limits.gs_max_altitude_m))
            .map(|s| format!("{}@{}ms: {:.2} m", s.node_id, s.time_ms, s.geodetic.alt_m)),
        MAX_SAMPLES,
    )?;

    // A ground node's altitude must be bit-identical at every timestamp.
    let mut first_alt: BTreeMap<&str, f64> = BTreeMap::new();
    let mut drifted = Vec::new();
    for s in samples.iter().filter(|s| s.is_ground) {
        let first = *first_alt.entry(s.node_id).or_insert(s.geodetic.alt_m);
        if s.geodetic.alt_m.to_bits() != first.to_bits() {
            drifted.push(format!("{}@{}ms: {} vs {}", s.node_id, s.time_ms, s.geodetic.alt_m, first));
        }
    }
    fail(Rule::AltitudeDrift, "ground rows with altitude drift", drifted, MAX_SAMPLES)
}

/// Fold a heading into `[0, 360)`. Non-finite input stays NaN.
fn normalized_heading(deg: f64) -> f64 {
    let folded = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

fn sentinels_and_ranges(samples: &[Sample<'_>], limits: &GroundAerialRules) -> Result<(), Violation> {
    let heading_ok = |s: &Sample<'_>| {
        if s.is_ground {
            s.heading_deg == limits.sentinel
        } else {
            (0.0..360.0).contains(&s.heading_norm_deg)
        }
    };
    fail(
        Rule::Heading,
        &format!("rows with ground heading != {} or non-finite aerial heading", limits.sentinel),
        samples
            .iter()
            .filter(|&s| !heading_ok(s))
            .map(|s| format!("{}@{}ms: {}", s.node_id, s.time_ms, s.heading_deg)),
        MAX_SAMPLES,
    )?;

    let battery_ok = |s: &Sample<'_>| {
        if s.is_ground {
            s.battery_pct == limits.sentinel
        } else {
            s.battery_pct.is_finite()
        }
    };
    fail(
        Rule::Battery,
        &format!("rows with ground battery != {} or non-finite aerial battery", limits.sentinel),
        samples
            .iter()
            .filter(|&s| !battery_ok(s))
            .map(|s| format!("{}@{}ms: {}", s.node_id, s.time_ms, s.battery_pct)),
        MAX_SAMPLES,
    )
}

type Tracks<'s, 'a> = BTreeMap<&'a str, Vec<&'s Sample<'a>>>;

fn battery_rate(tracks: &Tracks<'_, '_>, limits: &GroundAerialRules) -> Result<(), Violation> {
    let mut fast = Vec::new();
    for track in tracks.values().filter(|t| t.first().map_or(false, |s| !s.is_ground)) {
        for pair in track.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let dt_s = (b.time_ms - a.time_ms) as f64 / MS_PER_SEC as f64;
            if dt_s == 0.0 {
                continue;
            }
            let rate = (b.battery_pct - a.battery_pct).abs() / dt_s;
            if rate > limits.max_battery_rate_pct_per_s {
                fast.push(format!("{}@{}ms: {:.2} %/s", b.node_id, b.time_ms, rate));
            }
        }
    }
    fail(
        Rule::BatteryRate,
        &format!(
            "battery changes faster than {} %/s",
            limits.max_battery_rate_pct_per_s
        ),
        fast,
        MAX_RATE_SAMPLES,
    )
}

fn relay_role(tracks: &Tracks<'_, '_>, limits: &GroundAerialRules) -> Result<(), Violation> {
    let mut missing = Vec::new();
    for track in tracks.values() {
        for pair in track.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let moved = a.position.distance_to(&b.position);
            if moved > limits.relay_displacement_m && b.role != Role::Relay.tag() {
                missing.push(format!("{}@{}ms moved {:.2} m as {}", b.node_id, b.time_ms, moved, b.role));
            }
        }
    }
    fail(
        Rule::RelayRole,
        &format!(
            "samples moved more than {} m without the {} role",
            limits.relay_displacement_m,
            Role::Relay.tag()
        ),
        missing,
        MAX_SAMPLES,
    )
}
