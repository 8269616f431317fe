//! State machine that applies committed log entries to the catalog store.
//!
//! Every entry runs in its own write transaction at the entry's index.
//! Snapshots carry every row verbatim; installing one goes through the
//! store's validating restore path.

use catalog_state::{CoordinateEntry, Node, StateStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FsmError, FsmResult};
use crate::typ::{LogEntry, Request, Response};

/// Serialized form of a whole-store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub last_index: u64,
    pub nodes: Vec<Node>,
    pub coordinates: Vec<CoordinateEntry>,
}

impl SnapshotData {
    pub fn to_bytes(&self) -> FsmResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> FsmResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Catalog state machine.
pub struct StateMachine {
    store: StateStore,
    last_applied: u64,
}

impl StateMachine {
    /// Wrap a store, resuming after the highest index it holds.
    pub fn new(store: StateStore) -> FsmResult<Self> {
        let last_applied = store.last_index()?;
        debug!(last_applied, "state machine opened");
        Ok(Self {
            store,
            last_applied,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Apply one committed entry.
    ///
    /// Entries must arrive in increasing index order; anything at or below
    /// the last applied index is rejected without touching the store.
    /// The entry's index is recorded even when the request changes no rows,
    /// so a reopened store resumes after it.
    pub fn apply(&mut self, entry: &LogEntry) -> FsmResult<Response> {
        if entry.index <= self.last_applied {
            warn!(
                index = entry.index,
                last_applied = self.last_applied,
                "rejecting out-of-order log entry"
            );
            return Err(FsmError::OutOfOrder {
                index: entry.index,
                last_applied: self.last_applied,
            });
        }

        let mut tx = self.store.begin_write(entry.index)?;
        let success = match &entry.request {
            Request::RegisterNode { node } => {
                tx.ensure_node(node)?;
                true
            }
            Request::DeregisterNode { node } => tx.delete_node(node)?,
            Request::CoordinateBatchUpdate { updates } => {
                tx.coordinate_batch_update(updates)?;
                true
            }
        };
        tx.mark_applied();
        tx.commit()?;

        self.last_applied = entry.index;
        debug!(index = entry.index, success, "applied log entry");
        Ok(Response {
            index: entry.index,
            success,
        })
    }

    /// Apply a run of entries, stopping at the first error.
    pub fn apply_all<'a>(
        &mut self,
        entries: impl IntoIterator<Item = &'a LogEntry>,
    ) -> FsmResult<Vec<Response>> {
        entries.into_iter().map(|entry| self.apply(entry)).collect()
    }

    /// Capture the current state of the store.
    pub fn build_snapshot(&self) -> FsmResult<SnapshotData> {
        let snap = self.store.snapshot()?;
        let data = SnapshotData {
            last_index: snap.last_index(),
            nodes: snap.nodes()?.collect(),
            coordinates: snap.coordinates()?.collect(),
        };
        debug!(
            last_index = data.last_index,
            nodes = data.nodes.len(),
            coordinates = data.coordinates.len(),
            "built snapshot"
        );
        Ok(data)
    }

    /// Replace the store's contents with a snapshot from another replica.
    pub fn install_snapshot(&mut self, data: &SnapshotData) -> FsmResult<()> {
        let mut restore = self.store.restore()?;
        for node in &data.nodes {
            restore.node(data.last_index, node)?;
        }
        restore.coordinates(data.last_index, &data.coordinates)?;
        restore.applied(data.last_index);
        restore.commit()?;

        self.last_applied = data.last_index;
        info!(last_index = data.last_index, "installed snapshot");
        Ok(())
    }
}
