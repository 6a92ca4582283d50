//! Trace rows, one per node per instant.
//!
//! Field order is column order: the `csv` serializer writes the header from
//! these structs, so they must match [`Profile::columns`].

use serde::{Deserialize, Serialize};

use crate::frames::EcefPosition;
use crate::profile::{NodeType, Profile, Role};

/// Common view of a trace row used by the structural check and chunk writer.
pub trait TraceRow: Serialize + Send + Sync {
    const PROFILE: Profile;

    fn time_ms(&self) -> u64;
    fn node_id(&self) -> &str;
    fn address(&self) -> &str;
    fn position(&self) -> EcefPosition;
}

/// Orbital-profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatRecord {
    pub time_ms: u64,
    pub node_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ecef_x: f64,
    pub ecef_y: f64,
    pub ecef_z: f64,
    pub altitude_km: f64,
    pub orbit_id: i32,
    pub ip: String,
    pub radius_km: f64,
}

/// Ground+aerial-profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavRecord {
    pub time_ms: u64,
    pub node_id: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ecef_x: f64,
    pub ecef_y: f64,
    pub ecef_z: f64,
    pub ip: String,
    /// Course over ground in [0, 360), or -1 for ground nodes
    pub heading_deg: f64,
    /// Remaining battery in percent, or -1 for ground nodes
    pub battery_pct: f64,
}

impl TraceRow for SatRecord {
    const PROFILE: Profile = Profile::Orbital;

    fn time_ms(&self) -> u64 {
        self.time_ms
    }

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn address(&self) -> &str {
        &self.ip
    }

    fn position(&self) -> EcefPosition {
        EcefPosition::new(self.ecef_x, self.ecef_y, self.ecef_z)
    }
}

impl TraceRow for UavRecord {
    const PROFILE: Profile = Profile::GroundAerial;

    fn time_ms(&self) -> u64 {
        self.time_ms
    }

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn address(&self) -> &str {
        &self.ip
    }

    fn position(&self) -> EcefPosition {
        EcefPosition::new(self.ecef_x, self.ecef_y, self.ecef_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of<R: Serialize>(row: &R) -> Vec<String> {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.serialize(row).unwrap();
        let bytes = w.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        text.lines().next().unwrap().split(',').map(str::to_string).collect()
    }

    #[test]
    fn test_sat_header_matches_profile() {
        let row = SatRecord {
            time_ms: 0,
            node_id: "SAT_01".into(),
            name: "STARLINK-1007".into(),
            node_type: NodeType::Sat,
            ecef_x: 1.0,
            ecef_y: 2.0,
            ecef_z: 3.0,
            altitude_km: 550.0,
            orbit_id: -1,
            ip: "10.0.3.1".into(),
            radius_km: 6921.0,
        };
        assert_eq!(header_of(&row), Profile::Orbital.columns());
    }

    #[test]
    fn test_uav_header_matches_profile() {
        let row = UavRecord {
            time_ms: 100,
            node_id: "UAV_01".into(),
            role: Role::Relay,
            node_type: NodeType::Uav,
            ecef_x: 1.0,
            ecef_y: 2.0,
            ecef_z: 3.0,
            ip: "10.0.0.2".into(),
            heading_deg: 90.0,
            battery_pct: 99.5,
        };
        assert_eq!(header_of(&row), Profile::GroundAerial.columns());
    }
}
