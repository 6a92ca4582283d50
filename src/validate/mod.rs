//! Schema validation of trace chunks.
//!
//! Each profile validator reads one file and returns a [`Verdict`]:
//! - `Pass` when every rule holds
//! - `Fail` with the first violated [`Rule`], a reason and a few offending samples
//! - `Error` when the file cannot be read or parsed (message truncated)
//!
//! Rules run in a fixed order and stop at the first violation. Validators are
//! side-effect free; [`validate_dir`] runs them in parallel over a directory.

mod batch;
pub(crate) mod ground_aerial;
pub(crate) mod orbital;
mod rules;
mod table;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::profile::Profile;
use crate::propagator::GeodeticConverter;

pub use batch::{validate_dir, BatchReport};
pub use ground_aerial::{validate_ground_aerial, GroundAerialRules};
pub use orbital::{validate_orbital, OrbitalRules};
pub use table::{TableError, TraceTable};

/// Longest ERROR message kept, in characters.
pub const MAX_ERROR_CHARS: usize = 100;

/// Offending samples kept in a FAIL reason.
pub const MAX_SAMPLES: usize = 3;

/// A named validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Filename,
    Columns,
    Nulls,
    RowsPerTimestamp,
    Duplicates,
    TimestampStep,
    TimestampCount,
    RowTotal,
    NodeType,
    FiniteCoordinates,
    Altitude,
    Radius,
    Area,
    AltitudeDrift,
    Heading,
    Battery,
    BatteryRate,
    RelayRole,
    Address,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Filename => "filename",
            Rule::Columns => "columns",
            Rule::Nulls => "nulls",
            Rule::RowsPerTimestamp => "rows per timestamp",
            Rule::Duplicates => "duplicates",
            Rule::TimestampStep => "timestamp step",
            Rule::TimestampCount => "timestamp count",
            Rule::RowTotal => "row total",
            Rule::NodeType => "node type",
            Rule::FiniteCoordinates => "finite coordinates",
            Rule::Altitude => "altitude",
            Rule::Radius => "radius",
            Rule::Area => "area",
            Rule::AltitudeDrift => "altitude drift",
            Rule::Heading => "heading",
            Rule::Battery => "battery",
            Rule::BatteryRate => "battery rate",
            Rule::RelayRole => "relay role",
            Rule::Address => "address",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A violated rule with a bounded sample of offending rows or timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: Rule,
    pub reason: String,
    pub samples: Vec<String>,
}

impl Violation {
    pub fn new(rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
            samples: Vec::new(),
        }
    }

    pub fn with_samples<I, T>(mut self, samples: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        self.samples = samples.into_iter().take(cap).map(|s| s.to_string()).collect();
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.reason)?;
        if !self.samples.is_empty() {
            write!(f, " [{}]", self.samples.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail(Violation),
    Error { message: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail(_) => "FAIL",
            Verdict::Error { .. } => "ERROR",
        }
    }

    /// The violated rule, for a FAIL.
    pub fn rule(&self) -> Option<Rule> {
        match self {
            Verdict::Fail(v) => Some(v.rule),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail(v) => write!(f, "FAIL ({v})"),
            Verdict::Error { message } => write!(f, "ERROR ({message})"),
        }
    }
}

/// Verdict for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub profile: Profile,
    pub verdict: Verdict,
}

/// Limits for both profiles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationRules {
    pub orbital: OrbitalRules,
    pub ground_aerial: GroundAerialRules,
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// False for NaN.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Why a file did not pass.
#[derive(Debug)]
pub(crate) enum Finding {
    Violation(Violation),
    Unreadable(String),
}

impl From<Violation> for Finding {
    fn from(v: Violation) -> Self {
        Finding::Violation(v)
    }
}

impl From<TableError> for Finding {
    fn from(e: TableError) -> Self {
        Finding::Unreadable(e.to_string())
    }
}

pub(crate) fn into_verdict(result: Result<(), Finding>) -> Verdict {
    match result {
        Ok(()) => Verdict::Pass,
        Err(Finding::Violation(v)) => Verdict::Fail(v),
        Err(Finding::Unreadable(message)) => Verdict::Error {
            message: truncate_chars(&message, MAX_ERROR_CHARS),
        },
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Validate one file with the profile its name selects. `None` when the
/// name matches no profile.
pub fn validate_file<G: GeodeticConverter>(
    path: &Path,
    rules: &ValidationRules,
    geodetic: &G,
) -> Option<FileReport> {
    let file = file_name(path);
    let profile = Profile::classify(&file)?;
    let verdict = match profile {
        Profile::Orbital => validate_orbital(path, &rules.orbital),
        Profile::GroundAerial => validate_ground_aerial(path, &rules.ground_aerial, geodetic),
    };
    Some(FileReport { file, profile, verdict })
}
