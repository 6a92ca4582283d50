//! Orbital-profile validator.

use std::path::Path;

use super::rules;
use super::{file_name, into_verdict, Bounds, Finding, Rule, TraceTable, Verdict, Violation, MAX_SAMPLES};
use crate::config::ScenarioConfig;
use crate::constants::MEAN_EARTH_RADIUS_KM;
use crate::profile::{NodeType, Profile};
use crate::record::SatRecord;

/// Limits for orbital chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalRules {
    /// Rows per timestamp.
    pub expected_nodes: usize,
    pub step_ms: u64,
    pub timestamps_per_chunk: usize,
    pub altitude_km: Bounds,
    pub radius_km: Bounds,
    pub address_prefix: String,
}

impl Default for OrbitalRules {
    fn default() -> Self {
        Self {
            expected_nodes: 50,
            step_ms: Profile::Orbital.step_ms(),
            timestamps_per_chunk: 60,
            altitude_km: Bounds::new(200.0, 1200.0),
            radius_km: Bounds::new(MEAN_EARTH_RADIUS_KM, 7000.0),
            address_prefix: Profile::Orbital.address_prefix().to_string(),
        }
    }
}

impl OrbitalRules {
    /// Limits matching a generated scenario with `node_count` nodes.
    pub fn for_scenario(config: &ScenarioConfig, node_count: usize) -> Self {
        Self {
            expected_nodes: node_count,
            step_ms: config.step_ms,
            timestamps_per_chunk: (config.chunk_duration_ms / config.step_ms.max(1)) as usize,
            address_prefix: config.address_prefix.clone(),
            ..Self::default()
        }
    }
}

pub fn validate_orbital(path: &Path, limits: &OrbitalRules) -> Verdict {
    into_verdict(check(path, limits))
}

fn check(path: &Path, limits: &OrbitalRules) -> Result<(), Finding> {
    let profile = Profile::Orbital;
    rules::filename(&file_name(path), profile)?;

    let table = TraceTable::from_path(path)?;
    rules::columns(&table, profile.columns())?;
    rules::no_nulls(&table)?;

    let times = table.u64s("time_ms")?;
    let node_ids = table.text("node_id")?;
    rules::rows_per_timestamp(&times, limits.expected_nodes)?;
    rules::unique_pairs(&times, &node_ids)?;
    rules::timestamp_step(&times, limits.step_ms)?;
    rules::timestamp_count(&times, limits.timestamps_per_chunk)?;
    rules::node_types(&table.text("type")?, &[NodeType::Sat])?;

    within(Rule::Altitude, "altitude_km", &table.f64s("altitude_km")?, &node_ids, limits.altitude_km)?;
    within(Rule::Radius, "radius_km", &table.f64s("radius_km")?, &node_ids, limits.radius_km)?;

    rules::addresses(&table.text("ip")?, &limits.address_prefix)?;
    Ok(())
}

/// Altitude and radius bands on rows still in memory.
pub(crate) fn check_records(rows: &[SatRecord], limits: &OrbitalRules) -> Result<(), Violation> {
    let node_ids: Vec<&str> = rows.iter().map(|r| r.node_id.as_str()).collect();
    let altitudes: Vec<f64> = rows.iter().map(|r| r.altitude_km).collect();
    let radii: Vec<f64> = rows.iter().map(|r| r.radius_km).collect();
    within(Rule::Altitude, "altitude_km", &altitudes, &node_ids, limits.altitude_km)?;
    within(Rule::Radius, "radius_km", &radii, &node_ids, limits.radius_km)
}

fn within(rule: Rule, column: &str, values: &[f64], node_ids: &[&str], bounds: Bounds) -> Result<(), Violation> {
    let out: Vec<String> = values
        .iter()
        .zip(node_ids)
        .filter(|(v, _)| !bounds.contains(**v))
        .map(|(v, id)| format!("{id}: {v}"))
        .collect();
    if out.is_empty() {
        return Ok(());
    }
    Err(Violation::new(rule, format!("{} {column} values outside {bounds}", out.len()))
        .with_samples(out, MAX_SAMPLES))
}
