//! Point-in-time export and bulk restore.
//!
//! A [`Snapshot`] is a read transaction held open for as long as the
//! export takes; it yields rows exactly as stored, invalid ones included,
//! so the receiving side sees the same data a log replay would have
//! produced. [`Restore`] is the receiving side: it wipes the store and
//! loads rows through the same checks as the normal write path, so bad
//! rows never make it across.

use tracing::info;

use crate::error::StateResult;
use crate::store::StateStore;
use crate::tables::*;
use crate::txn::{ReadTxn, WriteTxn};
use crate::types::{CoordinateEntry, Node};

/// Frozen view of the whole store.
pub struct Snapshot {
    txn: ReadTxn,
    last_index: u64,
}

impl Snapshot {
    /// Highest table index at the pinned version.
    pub fn last_index(&self) -> u64 {
        self.last_index
    }

    /// Index of a single table at the pinned version.
    pub fn table_index(&self, table: &str) -> StateResult<u64> {
        self.txn.table_index(table)
    }

    /// Every node record.
    pub fn nodes(&self) -> StateResult<std::vec::IntoIter<Node>> {
        Ok(self.txn.nodes()?.into_iter())
    }

    /// Every coordinate row, ordered by `(node, segment)`, unvalidated.
    pub fn coordinates(&self) -> StateResult<std::vec::IntoIter<CoordinateEntry>> {
        Ok(self.txn.coordinates(None)?.into_iter())
    }
}

/// Bulk loader that replaces the store's contents in one commit.
///
/// Dropping a `Restore` without calling [`Restore::commit`] leaves the
/// store untouched.
pub struct Restore {
    tx: WriteTxn,
    nodes: usize,
    coordinates: usize,
    dropped: usize,
}

impl Restore {
    /// Load a node record as-is and raise the nodes table index to `index`.
    pub fn node(&mut self, index: u64, node: &Node) -> StateResult<()> {
        self.tx.put_node(node)?;
        self.tx.raise_table_index(TABLE_NODES, index);
        self.nodes += 1;
        Ok(())
    }

    /// Load coordinate rows and raise the coordinates table index to `index`.
    ///
    /// Rows for nodes not restored so far, and rows with non-finite values,
    /// are dropped.
    pub fn coordinates(&mut self, index: u64, entries: &[CoordinateEntry]) -> StateResult<()> {
        for entry in entries {
            if self.tx.apply_coordinate(entry)? {
                self.coordinates += 1;
            } else {
                self.dropped += 1;
            }
        }
        self.tx.raise_table_index(TABLE_COORDINATES, index);
        Ok(())
    }

    /// Record `index` as the last applied log position.
    pub fn applied(&mut self, index: u64) {
        self.tx.raise_table_index(INDEX_APPLIED, index);
    }

    /// Publish the restored contents and wake every blocked reader.
    pub fn commit(self) -> StateResult<()> {
        let Restore {
            tx,
            nodes,
            coordinates,
            dropped,
        } = self;
        tx.commit()?;
        info!(nodes, coordinates, dropped, "restore committed");
        Ok(())
    }

    /// Discard the restore.
    pub fn abort(self) -> StateResult<()> {
        self.tx.abort()
    }
}

impl StateStore {
    /// Pin the current version of the entire store for export.
    pub fn snapshot(&self) -> StateResult<Snapshot> {
        let txn = self.begin_read()?;
        let last_index = txn.last_index()?;
        Ok(Snapshot { txn, last_index })
    }

    /// Start replacing the store's contents.
    ///
    /// Holds the store's write slot until committed or dropped.
    pub fn restore(&self) -> StateResult<Restore> {
        let mut tx = self.begin_write(0)?;
        tx.clear_all()?;
        tx.fire_all_on_commit();
        Ok(Restore {
            tx,
            nodes: 0,
            coordinates: 0,
            dropped: 0,
        })
    }
}
