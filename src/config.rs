//! Scenario configuration.
//!
//! One immutable [`ScenarioConfig`] is built per run (defaults, optionally a
//! JSON file, then CLI overrides), checked once with
//! [`ScenarioConfig::validate`], and passed by reference into every stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MS_PER_SEC;
use crate::epoch::Epoch;
use crate::frames::Geodetic;
use crate::profile::Profile;

/// Largest node count that still fits in the final address octet.
pub const MAX_ADDRESSABLE_NODES: usize = 254;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("step_ms must be positive")]
    ZeroStep,

    #[error("duration_ms must be positive")]
    ZeroDuration,

    #[error("chunk duration {chunk_ms} ms is not a positive multiple of the {step_ms} ms step")]
    ChunkNotMultipleOfStep { chunk_ms: u64, step_ms: u64 },

    #[error("duration {duration_ms} ms is not a multiple of the {chunk_ms} ms chunk duration")]
    DurationNotMultipleOfChunk { duration_ms: u64, chunk_ms: u64 },

    #[error("max_nodes must be in 1..=254, got {0}")]
    NodeCount(usize),

    #[error("observer latitude {0}° is outside [-90, 90]")]
    Latitude(f64),

    #[error("address prefix '{0}' must be three dotted octets followed by a dot")]
    AddressPrefix(String),

    #[error("scenario name must be a non-empty single path component, got '{0}'")]
    ScenarioName(String),

    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Observation point for visibility selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverSite {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub elevation_m: f64,
}

impl ObserverSite {
    pub fn geodetic(&self) -> Geodetic {
        Geodetic::new(self.lat_deg, self.lon_deg, self.elevation_m)
    }
}

impl Default for ObserverSite {
    fn default() -> Self {
        Self {
            lat_deg: 30.0,
            lon_deg: 104.0,
            elevation_m: 500.0,
        }
    }
}

/// Everything a generation run depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub scenario_name: String,
    /// Reference epoch; `time_ms = 0` in every trace.
    pub epoch: Epoch,
    pub duration_ms: u64,
    pub step_ms: u64,
    pub chunk_duration_ms: u64,
    pub observer: ObserverSite,
    pub min_elevation_deg: f64,
    pub max_range_km: f64,
    pub max_nodes: usize,
    /// Case-insensitive substring a catalog name must contain.
    pub catalog_filter: Option<String>,
    pub address_prefix: String,
    /// Traces go to `<output_root>/<scenario_name>/traces/`.
    pub output_root: PathBuf,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenario_name: "rescue_mission_2026_v1".to_string(),
            epoch: reference_epoch(),
            duration_ms: 600_000,
            step_ms: Profile::Orbital.step_ms(),
            chunk_duration_ms: 60_000,
            observer: ObserverSite::default(),
            min_elevation_deg: 0.0,
            max_range_km: 2000.0,
            max_nodes: 50,
            catalog_filter: Some("STARLINK".to_string()),
            address_prefix: Profile::Orbital.address_prefix().to_string(),
            output_root: PathBuf::from("output"),
        }
    }
}

fn reference_epoch() -> Epoch {
    // 2026-01-27 12:00:00 UTC
    Epoch::from_datetime(chrono::DateTime::from_timestamp(1_769_515_200, 0).unwrap_or_default())
}

impl ScenarioConfig {
    /// Reference settings for the ground+aerial profile.
    pub fn ground_aerial() -> Self {
        Self {
            step_ms: Profile::GroundAerial.step_ms(),
            catalog_filter: None,
            address_prefix: Profile::GroundAerial.address_prefix().to_string(),
            ..Self::default()
        }
    }

    /// Reference settings for `profile`.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Orbital => Self::default(),
            Profile::GroundAerial => Self::ground_aerial(),
        }
    }

    /// Load from a JSON file; absent fields take the reference values.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every precondition. Nothing may be written before this passes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_ms == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.duration_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.chunk_duration_ms == 0 || self.chunk_duration_ms % self.step_ms != 0 {
            return Err(ConfigError::ChunkNotMultipleOfStep {
                chunk_ms: self.chunk_duration_ms,
                step_ms: self.step_ms,
            });
        }
        if self.duration_ms % self.chunk_duration_ms != 0 {
            return Err(ConfigError::DurationNotMultipleOfChunk {
                duration_ms: self.duration_ms,
                chunk_ms: self.chunk_duration_ms,
            });
        }
        if !(1..=MAX_ADDRESSABLE_NODES).contains(&self.max_nodes) {
            return Err(ConfigError::NodeCount(self.max_nodes));
        }
        if !(-90.0..=90.0).contains(&self.observer.lat_deg) {
            return Err(ConfigError::Latitude(self.observer.lat_deg));
        }
        if !is_address_prefix(&self.address_prefix) {
            return Err(ConfigError::AddressPrefix(self.address_prefix.clone()));
        }
        let name = self.scenario_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::ScenarioName(self.scenario_name.clone()));
        }
        Ok(())
    }

    /// Number of sampled instants.
    pub fn total_steps(&self) -> u64 {
        self.duration_ms / self.step_ms
    }

    pub fn total_chunks(&self) -> u64 {
        self.duration_ms / self.chunk_duration_ms
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_ms as f64 / MS_PER_SEC as f64
    }

    pub fn scenario_dir(&self) -> PathBuf {
        self.output_root.join(&self.scenario_name)
    }

    pub fn trace_dir(&self) -> PathBuf {
        self.scenario_dir().join("traces")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.scenario_dir().join("manifest.json")
    }
}

/// `a.b.c.` with each octet 0..=255.
fn is_address_prefix(prefix: &str) -> bool {
    let Some(body) = prefix.strip_suffix('.') else {
        return false;
    };
    let octets: Vec<&str> = body.split('.').collect();
    octets.len() == 3
        && octets.iter().all(|o| {
            !o.is_empty() && o.len() <= 3 && o.bytes().all(|b| b.is_ascii_digit())
                && o.parse::<u16>().map_or(false, |v| v <= 255)
        })
}
