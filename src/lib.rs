//! # startrace
//!
//! Deterministic position traces for a mixed constellation of orbital and
//! ground/aerial nodes, written as fixed-duration CSV chunks plus a manifest,
//! and a validator that checks chunk files against two trace profiles.
//!
//! Pipeline: catalog → visibility selection → sampling on a uniform time grid
//! → structural check → chunk writer. The validator only reads files and can
//! be run on any trace directory.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod elements;
pub mod epoch;
pub mod error;
pub mod fleet;
pub mod frames;
pub mod pipeline;
pub mod profile;
pub mod propagator;
pub mod record;
pub mod sampler;
pub mod selector;
pub mod validate;
pub mod writer;

pub use catalog::{Catalog, CatalogError, CatalogNode, Tle};
pub use config::{ConfigError, ObserverSite, ScenarioConfig};
pub use epoch::Epoch;
pub use error::{Error, GenerationError, Result};
pub use fleet::{AerialNode, Fleet, GroundStation, MotionPlan};
pub use frames::{EcefPosition, EciPosition, Geodetic, Wgs84};
pub use pipeline::{generate_ground_aerial, generate_orbital};
pub use profile::{NodeType, Profile, Role};
pub use propagator::{FrameConverter, GeodeticConverter, J2Propagator, PropagationError, Propagator};
pub use record::{SatRecord, TraceRow, UavRecord};
pub use sampler::{check_structure, sample_fleet, sample_orbital, TimeGrid};
pub use selector::{select_visible, SelectedNode, SelectionError};
pub use validate::{validate_dir, BatchReport, FileReport, Rule, ValidationRules, Verdict, Violation};
pub use writer::{chunk_windows, write_scenario, ChunkWindow, Manifest};
