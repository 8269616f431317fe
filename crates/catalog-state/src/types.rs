//! Domain types for the catalog state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use catalog_core::Coordinate;

/// Unique name of a node in the catalog.
pub type NodeName = String;

/// Every stored coordinate of one node, keyed by segment name.
pub type CoordinateSet = BTreeMap<String, Coordinate>;

// ── Node ──────────────────────────────────────────────────────────

/// A registered catalog node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Node {
    pub node: NodeName,
    pub address: String,
    #[serde(default)]
    pub datacenter: String,
    /// Arbitrary key/value metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// Index of the write that first registered the node.
    #[serde(default)]
    pub create_index: u64,
    /// Index of the latest write to the node record.
    #[serde(default)]
    pub modify_index: u64,
}

impl Node {
    pub fn new(node: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            address: address.into(),
            ..Self::default()
        }
    }
}

// ── Coordinate ────────────────────────────────────────────────────

/// One row of the coordinates table: a node's coordinate in a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinateEntry {
    pub node: NodeName,
    /// Network segment; empty for the default segment.
    #[serde(default)]
    pub segment: String,
    pub coord: Coordinate,
}

impl CoordinateEntry {
    pub fn new(node: impl Into<String>, segment: impl Into<String>, coord: Coordinate) -> Self {
        Self {
            node: node.into(),
            segment: segment.into(),
            coord,
        }
    }

    /// Build the tuple key for the coordinates table.
    pub fn table_key(&self) -> (&str, &str) {
        (self.node.as_str(), self.segment.as_str())
    }
}
