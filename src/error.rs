use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::propagator::PropagationError;
use crate::selector::SelectionError;
use crate::validate::Violation;

/// A generated trace failed its structural check or could not be published.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("trace is empty")]
    EmptyTrace,

    #[error("timestamps are not in ascending order at {time_ms} ms")]
    Unordered { time_ms: u64 },

    #[error("timestamp {time_ms} ms is missing from the trace")]
    MissingTimestamp { time_ms: u64 },

    #[error("timestamp {time_ms} ms is not on the {step_ms} ms grid of the scenario")]
    OffGrid { time_ms: u64, step_ms: u64 },

    #[error("timestamp {time_ms} ms has {found} rows, expected {expected}")]
    RowCount {
        time_ms: u64,
        found: usize,
        expected: usize,
    },

    #[error("row at {time_ms} ms has an empty {field}")]
    MissingField { time_ms: u64, field: &'static str },

    #[error("{node_id} at {time_ms} ms has a non-finite position")]
    NonFinite { node_id: String, time_ms: u64 },

    #[error("{node_id} at {time_ms} ms is {radius_km:.3} km from the Earth's centre, limit {limit_km} km")]
    Radius {
        node_id: String,
        time_ms: u64,
        radius_km: f64,
        limit_km: f64,
    },

    #[error("generated trace breaks a validation rule: {0}")]
    OutOfBounds(Violation),

    #[error("cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write chunk {path}: {source}")]
    WriteChunk { path: PathBuf, source: csv::Error },

    #[error("failed to write manifest {path}: {source}")]
    WriteManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Top-level error of a generation or validation run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("cannot read trace directory {path}: {source}")]
    TraceDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
