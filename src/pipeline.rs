//! End-to-end generation: select, sample, check, write.
//!
//! Each stage runs to completion before the next starts, and nothing reaches
//! the output directory until the configuration and the full in-memory trace
//! have passed their checks. Those checks include the physical bands the
//! profile's validator applies, so a published scenario validates clean.

use tracing::info;

use crate::catalog::Catalog;
use crate::config::{ConfigError, ScenarioConfig, MAX_ADDRESSABLE_NODES};
use crate::error::{GenerationError, Result};
use crate::fleet::Fleet;
use crate::frames::Wgs84;
use crate::propagator::{FrameConverter, GeodeticConverter, Propagator};
use crate::sampler::{check_structure, sample_fleet, sample_orbital, TimeGrid, MAX_ORBITAL_RADIUS_KM};
use crate::selector::select_visible;
use crate::validate::{ground_aerial, orbital, GroundAerialRules, OrbitalRules};
use crate::writer::{write_scenario, Manifest};

/// Generate and publish an orbital scenario from a catalog.
pub fn generate_orbital<P, F, G>(
    catalog: &Catalog<P::Handle>,
    propagator: &P,
    frames: &F,
    geodetic: &G,
    config: &ScenarioConfig,
) -> Result<Manifest>
where
    P: Propagator,
    F: FrameConverter,
    G: GeodeticConverter,
{
    config.validate()?;
    info!(scenario = %config.scenario_name, epoch = %config.epoch, "generating orbital scenario");

    let nodes = select_visible(catalog, propagator, frames, config)?;
    let grid = TimeGrid::from_config(config);
    let rows = sample_orbital(&nodes, propagator, frames, geodetic, &config.epoch, grid)?;
    check_structure(&rows, grid, nodes.len(), Some(MAX_ORBITAL_RADIUS_KM))?;
    orbital::check_records(&rows, &OrbitalRules::for_scenario(config, nodes.len()))
        .map_err(GenerationError::OutOfBounds)?;

    Ok(write_scenario(&rows, config, nodes.len())?)
}

/// Generate and publish a ground+aerial scenario.
pub fn generate_ground_aerial(fleet: &Fleet, config: &ScenarioConfig) -> Result<Manifest> {
    config.validate()?;
    if fleet.group_size() > MAX_ADDRESSABLE_NODES {
        return Err(ConfigError::NodeCount(fleet.group_size()).into());
    }
    info!(
        scenario = %config.scenario_name,
        aerial = fleet.aerial.len(),
        "generating ground+aerial scenario"
    );

    let grid = TimeGrid::from_config(config);
    let rows = sample_fleet(fleet, grid, &config.address_prefix);
    check_structure(&rows, grid, fleet.group_size(), None)?;
    let limits = GroundAerialRules::for_scenario(config, fleet.group_size());
    ground_aerial::check_records(&rows, &limits, &Wgs84).map_err(GenerationError::OutOfBounds)?;

    Ok(write_scenario(&rows, config, fleet.group_size())?)
}
