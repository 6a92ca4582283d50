//! The two trace profiles.
//!
//! A profile fixes everything that both the writer and the validator must
//! agree on: filename prefix, sampling step, column set, address prefix and
//! node type tags.

use serde::{Deserialize, Serialize};

/// File extension shared by every trace chunk.
pub const TRACE_EXTENSION: &str = "csv";

/// Trace profile of a chunk file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Orbital nodes selected from a catalog.
    Orbital,
    /// One ground station plus aerial nodes.
    GroundAerial,
}

const ORBITAL_COLUMNS: &[&str] = &[
    "time_ms",
    "node_id",
    "name",
    "type",
    "ecef_x",
    "ecef_y",
    "ecef_z",
    "altitude_km",
    "orbit_id",
    "ip",
    "radius_km",
];

const GROUND_AERIAL_COLUMNS: &[&str] = &[
    "time_ms",
    "node_id",
    "role",
    "type",
    "ecef_x",
    "ecef_y",
    "ecef_z",
    "ip",
    "heading_deg",
    "battery_pct",
];

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Orbital, Profile::GroundAerial];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Orbital => "orbital",
            Profile::GroundAerial => "ground_aerial",
        }
    }

    /// Filename prefix, including the trailing underscore.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Profile::Orbital => "sat_trace_",
            Profile::GroundAerial => "uav_trace_",
        }
    }

    /// Sampling step in milliseconds.
    pub fn step_ms(&self) -> u64 {
        match self {
            Profile::Orbital => 1_000,
            Profile::GroundAerial => 100,
        }
    }

    /// Columns in file order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Profile::Orbital => ORBITAL_COLUMNS,
            Profile::GroundAerial => GROUND_AERIAL_COLUMNS,
        }
    }

    /// Network address prefix, including the trailing dot.
    pub fn address_prefix(&self) -> &'static str {
        match self {
            Profile::Orbital => "10.0.3.",
            Profile::GroundAerial => "10.0.0.",
        }
    }

    /// Node type tags allowed in the `type` column.
    pub fn node_types(&self) -> &'static [NodeType] {
        match self {
            Profile::Orbital => &[NodeType::Sat],
            Profile::GroundAerial => &[NodeType::Gs, NodeType::Uav],
        }
    }

    /// Chunk filename for a window.
    pub fn chunk_filename(&self, start_ms: u64, end_ms: u64) -> String {
        format!("{}{}_{}.{}", self.file_prefix(), start_ms, end_ms, TRACE_EXTENSION)
    }

    /// Profile a file belongs to, judged by its name prefix alone.
    pub fn classify(file_name: &str) -> Option<Profile> {
        Self::ALL
            .into_iter()
            .find(|p| file_name.starts_with(p.file_prefix()))
    }

    /// Parse `<prefix><start>_<end>.csv` back into its window bounds.
    pub fn parse_chunk_filename(&self, file_name: &str) -> Option<(u64, u64)> {
        let stem = file_name
            .strip_prefix(self.file_prefix())?
            .strip_suffix(TRACE_EXTENSION)?
            .strip_suffix('.')?;
        let (start, end) = stem.split_once('_')?;
        Some((parse_digits(start)?, parse_digits(end)?))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Node class written to the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Sat,
    Gs,
    Uav,
}

impl NodeType {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Sat => "SAT",
            NodeType::Gs => "GS",
            NodeType::Uav => "UAV",
        }
    }
}

/// Mission role of a ground or aerial node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Anchor,
    Relay,
    Scout,
}

impl Role {
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Anchor => "ANCHOR",
            Role::Relay => "RELAY",
            Role::Scout => "SCOUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_filename() {
        assert_eq!(Profile::Orbital.chunk_filename(0, 59_999), "sat_trace_0_59999.csv");
        assert_eq!(
            Profile::GroundAerial.chunk_filename(60_000, 119_999),
            "uav_trace_60000_119999.csv"
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(Profile::classify("sat_trace_0_59999.csv"), Some(Profile::Orbital));
        assert_eq!(Profile::classify("uav_trace_0_59999.csv"), Some(Profile::GroundAerial));
        assert_eq!(Profile::classify("manifest.csv"), None);
    }

    #[test]
    fn test_parse_chunk_filename() {
        let p = Profile::Orbital;
        assert_eq!(p.parse_chunk_filename("sat_trace_60000_119999.csv"), Some((60_000, 119_999)));
        assert_eq!(p.parse_chunk_filename("sat_trace_60000_119999.csv.bak"), None);
        assert_eq!(p.parse_chunk_filename("sat_trace_a_1.csv"), None);
        assert_eq!(p.parse_chunk_filename("sat_trace_1_2_3.csv"), None);
        assert_eq!(p.parse_chunk_filename("sat_trace__1.csv"), None);
        assert_eq!(p.parse_chunk_filename("uav_trace_0_1.csv"), None);
    }

    #[test]
    fn test_tags_match_serde() {
        assert_eq!(serde_json::to_string(&NodeType::Uav).unwrap(), "\"UAV\"");
        assert_eq!(serde_json::to_string(&Role::Relay).unwrap(), "\"RELAY\"");
        assert_eq!(serde_json::to_string(&Profile::GroundAerial).unwrap(), "\"ground_aerial\"");
    }
}
