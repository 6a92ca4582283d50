//! Chunked trace output and the scenario manifest.
//!
//! The trace is cut into consecutive windows of `chunk_duration_ms`, one CSV
//! file per window, named from the window's first and last nominal
//! millisecond. The manifest is written last and only when every chunk made
//! it to disk; on any failure the chunks already written by this run are
//! removed again. After a successful run, chunk files of the same profile that
//! the manifest does not list are deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::constants::MS_PER_SEC;
use crate::error::GenerationError;
use crate::profile::Profile;
use crate::record::TraceRow;

/// Half-open time window `[start_ms, start_ms + duration_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    pub index: u64,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl ChunkWindow {
    /// Last millisecond nominally inside the window, as used in filenames.
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms - 1
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_ms <= time_ms && time_ms < self.start_ms + self.duration_ms
    }

    pub fn filename(&self, profile: Profile) -> String {
        profile.chunk_filename(self.start_ms, self.end_ms())
    }
}

/// Windows covering `[0, duration_ms)` without gaps or overlap.
pub fn chunk_windows(duration_ms: u64, chunk_duration_ms: u64) -> Vec<ChunkWindow> {
    if chunk_duration_ms == 0 {
        return Vec::new();
    }
    (0..duration_ms / chunk_duration_ms)
        .map(|index| ChunkWindow {
            index,
            start_ms: index * chunk_duration_ms,
            duration_ms: chunk_duration_ms,
        })
        .collect()
}

/// Index of one generated scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub scenario_name: String,
    pub profile: Profile,
    /// Reference epoch, `%Y-%m-%d %H:%M:%S` UTC
    pub t0_utc: String,
    pub sim_duration_sec: f64,
    pub step_ms: u64,
    pub chunk_duration_sec: f64,
    pub node_count: usize,
    /// Chunk filenames in chronological order, relative to the trace directory
    pub trace_files: Vec<String>,
}

impl Manifest {
    pub fn for_scenario(config: &ScenarioConfig, profile: Profile, node_count: usize) -> Self {
        Self {
            scenario_name: config.scenario_name.clone(),
            profile,
            t0_utc: config.epoch.to_string(),
            sim_duration_sec: config.duration_sec(),
            step_ms: config.step_ms,
            chunk_duration_sec: config.chunk_duration_ms as f64 / MS_PER_SEC as f64,
            node_count,
            trace_files: chunk_windows(config.duration_ms, config.chunk_duration_ms)
                .iter()
                .map(|w| w.filename(profile))
                .collect(),
        }
    }
}

/// Write `rows` (time-ordered) as chunk files plus the manifest.
///
/// Publishing is all-or-nothing: a stale manifest is removed first, and if
/// any chunk or the manifest fails to write, every chunk written by this call
/// is deleted before the error is returned.
pub fn write_scenario<R: TraceRow>(
    rows: &[R],
    config: &ScenarioConfig,
    node_count: usize,
) -> Result<Manifest, GenerationError> {
    let trace_dir = config.trace_dir();
    fs::create_dir_all(&trace_dir).map_err(|source| GenerationError::CreateDir {
        path: trace_dir.clone(),
        source,
    })?;

    let manifest_path = config.manifest_path();
    remove_if_present(&manifest_path).map_err(|source| GenerationError::WriteManifest {
        path: manifest_path.clone(),
        source,
    })?;

    let manifest = Manifest::for_scenario(config, R::PROFILE, node_count);
    let windows = chunk_windows(config.duration_ms, config.chunk_duration_ms);
    let mut written: Vec<PathBuf> = Vec::with_capacity(windows.len());

    for window in &windows {
        let first = rows.partition_point(|r| r.time_ms() < window.start_ms);
        let len = rows[first..]
            .iter()
            .take_while(|r| window.contains(r.time_ms()))
            .count();
        let path = trace_dir.join(window.filename(R::PROFILE));

        if let Err(source) = write_chunk(&path, &rows[first..first + len]) {
            discard(&written);
            discard(std::slice::from_ref(&path));
            return Err(GenerationError::WriteChunk { path, source });
        }
        debug!(file = %path.display(), rows = len, "chunk written");
        written.push(path);
    }

    let published = serde_json::to_string_pretty(&manifest)
        .map_err(GenerationError::from)
        .and_then(|json| {
            fs::write(&manifest_path, json).map_err(|source| GenerationError::WriteManifest {
                path: manifest_path.clone(),
                source,
            })
        });
    if let Err(e) = published {
        discard(&written);
        return Err(e);
    }
    prune_stale(&trace_dir, R::PROFILE, &manifest.trace_files);

    info!(
        chunks = written.len(),
        manifest = %manifest_path.display(),
        "scenario published"
    );
    Ok(manifest)
}

fn write_chunk<R: TraceRow>(path: &Path, rows: &[R]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Remove chunk files of `profile` that the new manifest does not list, such
/// as the tail of an earlier, longer run. Other files are left alone.
fn prune_stale(trace_dir: &Path, profile: Profile, keep: &[String]) {
    let entries = match fs::read_dir(trace_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %trace_dir.display(), error = %e, "could not scan for stale chunks");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if profile.parse_chunk_filename(&name).is_none() || keep.contains(&name) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => debug!(file = %name, "removed stale chunk"),
            Err(e) => warn!(file = %name, error = %e, "could not remove stale chunk"),
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = remove_if_present(path) {
            warn!(file = %path.display(), error = %e, "could not remove partial chunk");
        }
    }
}
