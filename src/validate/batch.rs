//! Directory-level validation and the combined report.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::{file_name, validate_file, FileReport, ValidationRules, Verdict};
use crate::error::Error;
use crate::profile::{Profile, TRACE_EXTENSION};
use crate::propagator::GeodeticConverter;

/// Verdicts for every trace file in a directory, sorted by filename.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// CSV files whose name matches no profile.
    pub skipped: Vec<String>,
}

impl BatchReport {
    /// True when at least one file was validated and every one passed.
    pub fn all_passed(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.verdict.is_pass())
    }

    pub fn passed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Pass))
    }

    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Fail(_)))
    }

    pub fn errors(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Error { .. }))
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.verdict)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            writeln!(f, "no trace files")?;
        }
        for report in &self.files {
            writeln!(f, "[{}] {} ({})", report.verdict.label(), report.file, report.profile)?;
            match &report.verdict {
                Verdict::Pass => {}
                Verdict::Fail(v) => writeln!(f, "    {v}")?,
                Verdict::Error { message } => writeln!(f, "    {message}")?,
            }
        }
        for name in &self.skipped {
            writeln!(f, "[SKIP] {name}: unknown trace prefix")?;
        }
        write!(
            f,
            "{} passed, {} failed, {} errors, {} skipped",
            self.passed(),
            self.failed(),
            self.errors(),
            self.skipped.len()
        )
    }
}

/// Validate every `*.csv` file in `dir` with the profile its name selects.
pub fn validate_dir<G: GeodeticConverter>(
    dir: &Path,
    rules: &ValidationRules,
    geodetic: &G,
) -> Result<BatchReport, Error> {
    let trace_dir_error = |source| Error::TraceDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(trace_dir_error)? {
        let path = entry.map_err(trace_dir_error)?.path();
        let is_csv = path
            .extension()
            .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case(TRACE_EXTENSION));
        if path.is_file() && is_csv {
            candidates.push(path);
        }
    }

    let (known, unknown): (Vec<PathBuf>, Vec<PathBuf>) = candidates
        .into_iter()
        .partition(|p| Profile::classify(&file_name(p)).is_some());

    let mut files: Vec<FileReport> = known
        .par_iter()
        .filter_map(|path| validate_file(path, rules, geodetic))
        .collect();
    files.sort_by(|a, b| a.file.cmp(&b.file));

    let mut skipped: Vec<String> = unknown.iter().map(|p| file_name(p)).collect();
    skipped.sort();

    for report in &files {
        match &report.verdict {
            Verdict::Pass => info!(file = %report.file, "PASS"),
            other => warn!(file = %report.file, verdict = %other, "trace file rejected"),
        }
    }

    let report = BatchReport { files, skipped };
    info!(
        passed = report.passed(),
        failed = report.failed(),
        errors = report.errors(),
        skipped = report.skipped.len(),
        "validation finished"
    );
    Ok(report)
}
