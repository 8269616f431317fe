//! Read and write transactions over the catalog tables.
//!
//! A [`ReadTxn`] pins one committed version of the database. A
//! [`WriteTxn`] buffers row changes, the table indexes to stamp and the
//! watch keys to fire; nothing becomes visible until [`WriteTxn::commit`].
//! Dropping a write transaction without committing discards it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use tracing::debug;

use crate::error::{StateResult, map_err};
use crate::tables::*;
use crate::watch::{WatchKey, Watches};

/// Snapshot-isolated read handle.
pub struct ReadTxn {
    pub(crate) txn: ReadTransaction,
}

impl ReadTxn {
    pub(crate) fn new(txn: ReadTransaction) -> Self {
        Self { txn }
    }

    /// Index of the last write to `table` as of this version, 0 if never written.
    pub fn table_index(&self, table: &str) -> StateResult<u64> {
        let index = self.txn.open_table(INDEX).map_err(map_err!(Table))?;
        Ok(index
            .get(table)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Highest index among the given tables.
    pub fn max_index(&self, tables: &[&str]) -> StateResult<u64> {
        let mut max = 0;
        for table in tables {
            max = max.max(self.table_index(table)?);
        }
        Ok(max)
    }

    /// Highest index recorded, the applied log position included.
    pub fn last_index(&self) -> StateResult<u64> {
        let index = self.txn.open_table(INDEX).map_err(map_err!(Table))?;
        let mut max = 0;
        for entry in index.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            max = max.max(value.value());
        }
        Ok(max)
    }
}

/// Exclusive write handle.
///
/// redb admits one write transaction at a time, so holding a `WriteTxn`
/// serializes all other writers behind it.
pub struct WriteTxn {
    pub(crate) txn: WriteTransaction,
    index: u64,
    indexes: BTreeMap<&'static str, u64>,
    changed: BTreeSet<WatchKey>,
    fire_all: bool,
    watches: Arc<Watches>,
}

impl WriteTxn {
    pub(crate) fn new(txn: WriteTransaction, index: u64, watches: Arc<Watches>) -> Self {
        Self {
            txn,
            index,
            indexes: BTreeMap::new(),
            changed: BTreeSet::new(),
            fire_all: false,
            watches,
        }
    }

    /// Log index assigned to this transaction.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Stamp `table` with this transaction's index on commit.
    pub(crate) fn touch(&mut self, table: &'static str) {
        self.indexes.insert(table, self.index);
    }

    /// Stamp `table` with at least `index` on commit; never lowers what
    /// this transaction already recorded.
    pub(crate) fn raise_table_index(&mut self, table: &'static str, index: u64) {
        self.indexes
            .entry(table)
            .and_modify(|current| *current = (*current).max(index))
            .or_insert(index);
    }

    /// Record this transaction's index as the last applied log position.
    pub fn mark_applied(&mut self) {
        self.raise_table_index(INDEX_APPLIED, self.index);
    }

    /// Fire `key` on commit.
    pub(crate) fn changed(&mut self, key: WatchKey) {
        self.changed.insert(key);
    }

    /// Fire every registered watch on commit.
    pub(crate) fn fire_all_on_commit(&mut self) {
        self.fire_all = true;
    }

    /// Remove every row and index entry.
    pub(crate) fn clear_all(&mut self) -> StateResult<()> {
        {
            let mut nodes = self.txn.open_table(NODES).map_err(map_err!(Table))?;
            nodes.retain(|_, _| false).map_err(map_err!(Write))?;
        }
        {
            let mut coords = self.txn.open_table(COORDINATES).map_err(map_err!(Table))?;
            coords.retain(|_, _| false).map_err(map_err!(Write))?;
        }
        {
            let mut index = self.txn.open_table(INDEX).map_err(map_err!(Table))?;
            index.retain(|_, _| false).map_err(map_err!(Write))?;
        }
        self.indexes.clear();
        Ok(())
    }

    /// Publish all buffered changes atomically, then fire watches.
    pub fn commit(self) -> StateResult<()> {
        {
            let mut index = self.txn.open_table(INDEX).map_err(map_err!(Table))?;
            for (table, idx) in &self.indexes {
                index.insert(*table, *idx).map_err(map_err!(Write))?;
            }
        }
        self.txn.commit().map_err(map_err!(Commit))?;

        let fired = if self.fire_all {
            self.watches.fire_all()
        } else {
            self.watches.fire(&self.changed)
        };
        debug!(
            index = self.index,
            tables = ?self.indexes,
            changed = self.changed.len(),
            fired,
            "write transaction committed"
        );
        Ok(())
    }

    /// Discard all buffered changes.
    pub fn abort(self) -> StateResult<()> {
        self.txn.abort().map_err(map_err!(Transaction))?;
        debug!(index = self.index, "write transaction aborted");
        Ok(())
    }
}
