//! Candidate node catalog built from Two-Line Element sets.
//!
//! Parses standard NORAD/Space-Track TLE text (2-line and 3-line with name)
//! and turns each element set into a [`CatalogNode`] whose propagation handle
//! is the parsed [`Tle`].
//!
//! # TLE Format Reference
//! ```text
//! Line 0 (optional): Satellite Name (up to 24 chars)
//! Line 1: 1 NNNNNC NNNNNAAA NNNNN.NNNNNNNN +.NNNNNNNN +NNNNN-N +NNNNN-N N NNNNN
//! Line 2: 2 NNNNN NNN.NNNN NNN.NNNN NNNNNNN NNN.NNNN NNN.NNNN NN.NNNNNNNNNNNNNN
//! ```
//!
//! # Example
//! ```
//! use startrace::catalog::Catalog;
//!
//! let text = "STARLINK-1007\n\
//! 1 44713U 19074A   26027.50000000  .00001103  00000-0  93460-4 0  9993\n\
//! 2 44713  53.0537 162.4100 0001368  88.8870 271.2277 15.06391775 00007\n";
//!
//! let catalog = Catalog::from_tle_str(text, Some("starlink")).unwrap();
//! assert_eq!(catalog.len(), 1);
//! assert_eq!(catalog.nodes()[0].name, "STARLINK-1007");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::*;
use crate::elements::MeanElements;
use crate::epoch::Epoch;

/// Catalog loading errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Line 1 must start with '1', got '{0}'")]
    InvalidLine1Start(char),

    #[error("Line 2 must start with '2', got '{0}'")]
    InvalidLine2Start(char),

    #[error("Line {line} is shorter than 69 characters ({len})")]
    ShortLine { line: u8, len: usize },

    #[error("NORAD IDs don't match between lines: {0} vs {1}")]
    NoradIdMismatch(u32, u32),

    #[error("Checksum failed on line {line}: expected {expected}, computed {computed}")]
    ChecksumFailed {
        line: u8,
        expected: u8,
        computed: u8,
    },

    #[error("Failed to parse field '{field}': {source}")]
    ParseField {
        field: &'static str,
        source: std::num::ParseFloatError,
    },

    #[error("Failed to parse integer field '{field}': {source}")]
    ParseIntField {
        field: &'static str,
        source: std::num::ParseIntError,
    },

    #[error("Failed to parse implied-decimal field '{0}'")]
    ImpliedDecimal(String),

    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Catalog contains no candidate nodes")]
    Empty,
}

/// A parsed Two-Line Element set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tle {
    /// Satellite name (from line 0, if present).
    pub name: Option<String>,
    /// NORAD catalog number.
    pub norad_id: u32,
    /// Epoch year (full 4-digit year).
    pub epoch_year: u16,
    /// Epoch day of year (fractional).
    pub epoch_day: f64,
    /// B* drag term (1/Earth radii).
    pub bstar: f64,
    /// Inclination (degrees).
    pub inclination_deg: f64,
    /// Right ascension of ascending node (degrees).
    pub raan_deg: f64,
    /// Eccentricity (dimensionless).
    pub eccentricity: f64,
    /// Argument of perigee (degrees).
    pub arg_perigee_deg: f64,
    /// Mean anomaly (degrees).
    pub mean_anomaly_deg: f64,
    /// Mean motion (revolutions per day).
    pub mean_motion_rev_day: f64,
}

impl Tle {
    /// Parse a TLE from two lines (without satellite name).
    pub fn parse(line1: &str, line2: &str) -> Result<Self, CatalogError> {
        Self::parse_with_name(None, line1, line2)
    }

    /// Parse a TLE from three lines (with satellite name on line 0).
    pub fn parse_3line(line0: &str, line1: &str, line2: &str) -> Result<Self, CatalogError> {
        Self::parse_with_name(Some(line0.trim().to_string()), line1, line2)
    }

    fn parse_with_name(name: Option<String>, line1: &str, line2: &str) -> Result<Self, CatalogError> {
        let l1 = line1.trim_end();
        let l2 = line2.trim_end();

        // The checksum column is mandatory, so 69 characters is a hard floor
        if l1.len() < 69 || !l1.is_ascii() {
            return Err(CatalogError::ShortLine { line: 1, len: l1.len() });
        }
        if l2.len() < 69 || !l2.is_ascii() {
            return Err(CatalogError::ShortLine { line: 2, len: l2.len() });
        }

        let c1 = l1.as_bytes()[0] as char;
        let c2 = l2.as_bytes()[0] as char;
        if c1 != '1' {
            return Err(CatalogError::InvalidLine1Start(c1));
        }
        if c2 != '2' {
            return Err(CatalogError::InvalidLine2Start(c2));
        }

        verify_checksum(l1, 1)?;
        verify_checksum(l2, 2)?;

        // ── Line 1 ──
        let norad_id_1 = parse_int::<u32>(&l1[2..7], "norad_id (line 1)")?;

        let epoch_year_2d = parse_int::<u16>(&l1[18..20], "epoch_year")?;
        let epoch_year = if epoch_year_2d >= 57 {
            1900 + epoch_year_2d
        } else {
            2000 + epoch_year_2d
        };
        let epoch_day = parse_float(&l1[20..32], "epoch_day")?;
        let bstar = parse_implied_decimal(&l1[53..61])?;

        // ── Line 2 ──
        let norad_id_2 = parse_int::<u32>(&l2[2..7], "norad_id (line 2)")?;
        if norad_id_1 != norad_id_2 {
            return Err(CatalogError::NoradIdMismatch(norad_id_1, norad_id_2));
        }

        // Eccentricity has an implied leading decimal point
        let eccentricity = parse_float(&format!("0.{}", l2[26..33].trim()), "eccentricity")?;

        Ok(Tle {
            name,
            norad_id: norad_id_1,
            epoch_year,
            epoch_day,
            bstar,
            inclination_deg: parse_float(&l2[8..16], "inclination")?,
            raan_deg: parse_float(&l2[17..25], "raan")?,
            eccentricity,
            arg_perigee_deg: parse_float(&l2[34..42], "arg_perigee")?,
            mean_anomaly_deg: parse_float(&l2[43..51], "mean_anomaly")?,
            mean_motion_rev_day: parse_float(&l2[52..63], "mean_motion")?,
        })
    }

    /// Parse a string containing multiple TLEs (2-line or 3-line format).
    ///
    /// Lines starting with '1' followed by a '2' line form a bare TLE; any
    /// other line followed by such a pair is taken as the name. Unrecognized
    /// lines are skipped.
    pub fn parse_batch(input: &str) -> Result<Vec<Self>, CatalogError> {
        let lines: Vec<&str> = input
            .lines()
            .map(|l| l.trim_end())
            .filter(|l| !l.is_empty())
            .collect();

        let mut tles = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if lines[i].starts_with('1') && i + 1 < lines.len() && lines[i + 1].starts_with('2') {
                tles.push(Tle::parse(lines[i], lines[i + 1])?);
                i += 2;
            } else if i + 2 < lines.len()
                && lines[i + 1].starts_with('1')
                && lines[i + 2].starts_with('2')
            {
                tles.push(Tle::parse_3line(lines[i], lines[i + 1], lines[i + 2])?);
                i += 3;
            } else {
                i += 1;
            }
        }

        if tles.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(tles)
    }

    /// Semi-major axis derived from mean motion (km), via Kepler's third law.
    pub fn semi_major_axis(&self) -> f64 {
        let n_rad_s = self.mean_motion_rev_day * TAU / SOLAR_DAY;
        (MU_EARTH / n_rad_s.powi(2)).powf(1.0 / 3.0)
    }

    /// TLE epoch as a UTC instant.
    pub fn epoch(&self) -> Option<Epoch> {
        Epoch::from_year_day(self.epoch_year as i32, self.epoch_day)
    }

    /// Mean elements at the TLE epoch, or `None` if the set cannot describe
    /// a bound orbit.
    pub fn to_mean_elements(&self) -> Option<MeanElements> {
        if !(self.mean_motion_rev_day.is_finite() && self.mean_motion_rev_day > 0.0) {
            return None;
        }
        let elements = MeanElements::from_degrees(
            self.semi_major_axis(),
            self.eccentricity,
            self.inclination_deg,
            self.raan_deg,
            self.arg_perigee_deg,
            self.mean_anomaly_deg,
            self.epoch()?,
        );
        elements.is_bound().then_some(elements)
    }

    /// Catalog display name: line 0 if present, otherwise the NORAD id.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("NORAD {}", self.norad_id),
        }
    }
}

/// One candidate node: identifier, name and an opaque propagation handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogNode<H> {
    pub id: u32,
    pub name: String,
    pub handle: H,
}

/// The full set of candidate nodes, in load order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog<H> {
    nodes: Vec<CatalogNode<H>>,
}

impl<H> Catalog<H> {
    pub fn new(nodes: Vec<CatalogNode<H>>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[CatalogNode<H>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Catalog<Tle> {
    /// Build a catalog from TLE text, keeping only nodes whose name contains
    /// `name_filter` (case-insensitive) when one is given.
    pub fn from_tle_str(input: &str, name_filter: Option<&str>) -> Result<Self, CatalogError> {
        let tles = Tle::parse_batch(input)?;
        let total = tles.len();
        let needle = name_filter.map(str::to_uppercase);

        let nodes: Vec<_> = tles
            .into_iter()
            .map(|tle| CatalogNode {
                id: tle.norad_id,
                name: tle.display_name(),
                handle: tle,
            })
            .filter(|node| match &needle {
                Some(n) => node.name.to_uppercase().contains(n.as_str()),
                None => true,
            })
            .collect();

        debug!(total, kept = nodes.len(), filter = ?name_filter, "parsed TLE catalog");
        if nodes.is_empty() {
            return Err(CatalogError::Empty);
        }
        info!(nodes = nodes.len(), "catalog loaded");
        Ok(Self { nodes })
    }

    /// Read and parse a TLE file.
    pub fn from_tle_file(path: &Path, name_filter: Option<&str>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_tle_str(&text, name_filter)
    }
}

fn parse_float(s: &str, field: &'static str) -> Result<f64, CatalogError> {
    s.trim()
        .parse::<f64>()
        .map_err(|source| CatalogError::ParseField { field, source })
}

fn parse_int<T>(s: &str, field: &'static str) -> Result<T, CatalogError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    s.trim()
        .parse::<T>()
        .map_err(|source| CatalogError::ParseIntField { field, source })
}

/// Parse the TLE "implied decimal" format: " NNNNN-N" → float.
///
/// Examples: " 16538-4" → 0.16538e-4, "-11606-4" → -0.11606e-4
fn parse_implied_decimal(s: &str) -> Result<f64, CatalogError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0.0);
    }

    // The exponent sign is the last '+' or '-' that isn't the leading sign
    let exp_pos = s
        .char_indices()
        .skip(1)
        .filter(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i)
        .last();

    let (mantissa, exponent) = match exp_pos {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, "+0"),
    };
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits = mantissa.trim_start_matches(['+', '-', ' ']);

    format!("{sign}0.{digits}e{exponent}")
        .parse::<f64>()
        .map_err(|_| CatalogError::ImpliedDecimal(s.to_string()))
}

/// Compare the mod-10 checksum in column 69 against the line contents.
fn verify_checksum(line: &str, line_no: u8) -> Result<(), CatalogError> {
    let expected = match line.as_bytes()[68] {
        b @ b'0'..=b'9' => b - b'0',
        _ => 0,
    };
    let computed = compute_checksum(&line[..68]);
    if expected != computed {
        return Err(CatalogError::ChecksumFailed {
            line: line_no,
            expected,
            computed,
        });
    }
    Ok(())
}

/// Compute TLE checksum (mod-10 of sum of digits, '-' counts as 1).
fn compute_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}
