//! Log payloads for the catalog state machine.

use catalog_state::{CoordinateEntry, Node};
use serde::{Deserialize, Serialize};

/// Client write request carried by one log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Register or update a node.
    RegisterNode { node: Node },
    /// Remove a node and its coordinates.
    DeregisterNode { node: String },
    /// Apply a batch of coordinate updates.
    CoordinateBatchUpdate { updates: Vec<CoordinateEntry> },
}

/// A committed entry of the replicated log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: u64,
    #[serde(flatten)]
    pub request: Request,
}

/// Response returned after an entry is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub index: u64,
    /// False when the request referred to something that does not exist
    /// (e.g. deregistering an unknown node).
    pub success: bool,
}

impl LogEntry {
    pub fn new(index: u64, request: Request) -> Self {
        Self { index, request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_state::Coordinate;

    #[test]
    fn request_serializes_roundtrip() {
        let entry = LogEntry::new(
            4,
            Request::CoordinateBatchUpdate {
                updates: vec![CoordinateEntry::new("node1", "lan", Coordinate::new(2))],
            },
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"coordinate_batch_update""#));
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn log_line_parses() {
        let line = r#"{"index":2,"type":"register_node","node":{"node":"web-1","address":"10.1.0.4"}}"#;
        let entry: LogEntry = serde_json::from_str(line).unwrap();
        assert_eq!(entry.index, 2);
        match entry.request {
            Request::RegisterNode { node } => {
                assert_eq!(node.node, "web-1");
                assert!(node.meta.is_empty());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn segment_defaults_to_empty() {
        let line = r#"{"index":3,"type":"coordinate_batch_update","updates":[{"node":"web-1","coord":{"vec":[0.1],"error":1.5,"adjustment":0,"height":0.00001}}]}"#;
        let entry: LogEntry = serde_json::from_str(line).unwrap();
        let Request::CoordinateBatchUpdate { updates } = entry.request else {
            panic!("wrong variant");
        };
        assert_eq!(updates[0].segment, "");
        assert!(updates[0].coord.is_valid());
    }
}
