//! The network coordinate table.
//!
//! Writes arrive as batches from the replicated log. Each entry is checked
//! against the nodes table and for numeric validity; entries that fail are
//! skipped without an error so every replica applying the same batch ends
//! up with the same rows. Reads never filter.

use redb::ReadableTable;
use tracing::debug;

use crate::error::{StateResult, map_err};
use crate::store::StateStore;
use crate::tables::*;
use crate::txn::{ReadTxn, WriteTxn};
use crate::types::{Coordinate, CoordinateEntry, CoordinateSet};
use crate::watch::{WatchKey, WatchSet};

impl ReadTxn {
    /// Stored coordinates of one node, keyed by segment.
    ///
    /// `segment` restricts the result to a single segment.
    pub fn coordinate(&self, node: &str, segment: Option<&str>) -> StateResult<CoordinateSet> {
        let table = self.txn.open_table(COORDINATES).map_err(map_err!(Table))?;
        let mut set = CoordinateSet::new();

        if let Some(segment) = segment {
            if let Some(guard) = table.get((node, segment)).map_err(map_err!(Read))? {
                let coord: Coordinate =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                set.insert(segment.to_string(), coord);
            }
            return Ok(set);
        }

        for entry in table.range((node, "")..).map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let (row_node, row_segment) = key.value();
            if row_node != node {
                break;
            }
            let coord: Coordinate =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            set.insert(row_segment.to_string(), coord);
        }
        Ok(set)
    }

    /// Every coordinate row ordered by `(node, segment)`.
    pub fn coordinates(&self, segment: Option<&str>) -> StateResult<Vec<CoordinateEntry>> {
        let table = self.txn.open_table(COORDINATES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let (row_node, row_segment) = key.value();
            if segment.is_some_and(|s| s != row_segment) {
                continue;
            }
            let coord: Coordinate =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(CoordinateEntry::new(row_node, row_segment, coord));
        }
        Ok(results)
    }
}

impl WriteTxn {
    /// Write a row without any checks and without stamping the table index.
    ///
    /// Only for store-internal tooling that must reproduce legacy rows.
    pub(crate) fn insert_coordinate_unchecked(&mut self, entry: &CoordinateEntry) -> StateResult<()> {
        let value = serde_json::to_vec(&entry.coord).map_err(map_err!(Serialize))?;
        {
            let mut table = self.txn.open_table(COORDINATES).map_err(map_err!(Table))?;
            table
                .insert(entry.table_key(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        self.changed(WatchKey::Table(TABLE_COORDINATES));
        self.changed(WatchKey::Prefix(TABLE_COORDINATES, entry.node.clone()));
        Ok(())
    }

    /// Upsert `entry` if its node exists and its coordinate is valid.
    pub(crate) fn apply_coordinate(&mut self, entry: &CoordinateEntry) -> StateResult<bool> {
        if !self.node_exists(&entry.node)? {
            debug!(node = %entry.node, segment = %entry.segment, "coordinate for unknown node dropped");
            return Ok(false);
        }
        if !entry.coord.is_valid() {
            debug!(node = %entry.node, segment = %entry.segment, "invalid coordinate dropped");
            return Ok(false);
        }
        self.insert_coordinate_unchecked(entry)?;
        Ok(true)
    }

    /// Apply one replicated batch of coordinate updates.
    ///
    /// Entries for unknown nodes and entries with non-finite components are
    /// skipped. The coordinates index is stamped even when nothing was
    /// written. Returns how many rows were written.
    pub fn coordinate_batch_update(&mut self, updates: &[CoordinateEntry]) -> StateResult<usize> {
        let mut written = 0;
        for update in updates {
            if self.apply_coordinate(update)? {
                written += 1;
            }
        }
        self.touch(TABLE_COORDINATES);
        debug!(
            index = self.index(),
            written,
            dropped = updates.len() - written,
            "coordinate batch applied"
        );
        Ok(written)
    }

    /// Remove every coordinate row owned by `node`, in all segments.
    pub(crate) fn delete_node_coordinates(&mut self, node: &str) -> StateResult<usize> {
        let removed = {
            let mut table = self.txn.open_table(COORDINATES).map_err(map_err!(Table))?;
            let mut segments = Vec::new();
            for entry in table.range((node, "")..).map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let (row_node, row_segment) = key.value();
                if row_node != node {
                    break;
                }
                segments.push(row_segment.to_string());
            }
            for segment in &segments {
                table
                    .remove((node, segment.as_str()))
                    .map_err(map_err!(Write))?;
            }
            segments.len()
        };
        if removed > 0 {
            self.changed(WatchKey::Table(TABLE_COORDINATES));
            self.changed(WatchKey::Prefix(TABLE_COORDINATES, node.to_string()));
        }
        self.touch(TABLE_COORDINATES);
        Ok(removed)
    }
}

impl StateStore {
    /// Apply a batch of coordinate updates at log position `index`.
    ///
    /// Only storage failures are errors. Rejected entries vanish silently.
    pub fn coordinate_batch_update(
        &self,
        index: u64,
        updates: &[CoordinateEntry],
    ) -> StateResult<()> {
        let mut tx = self.begin_write(index)?;
        tx.coordinate_batch_update(updates)?;
        tx.commit()
    }

    /// The coordinates of one node with the coordinates table index.
    ///
    /// An unknown node yields an empty set, not an error. Registers the
    /// table and the node's rows in `ws`.
    pub fn coordinate(
        &self,
        ws: Option<&mut WatchSet>,
        node: &str,
        segment: Option<&str>,
    ) -> StateResult<(u64, CoordinateSet)> {
        let txn = self.watched_read(
            ws,
            [
                WatchKey::Table(TABLE_COORDINATES),
                WatchKey::Prefix(TABLE_COORDINATES, node.to_string()),
            ],
        )?;
        let index = txn.table_index(TABLE_COORDINATES)?;
        Ok((index, txn.coordinate(node, segment)?))
    }

    /// Every coordinate row, ordered by `(node, segment)`, with the
    /// coordinates table index. Registers the table in `ws`.
    pub fn coordinates(
        &self,
        ws: Option<&mut WatchSet>,
        segment: Option<&str>,
    ) -> StateResult<(u64, Vec<CoordinateEntry>)> {
        let txn = self.watched_read(ws, [WatchKey::Table(TABLE_COORDINATES)])?;
        let index = txn.table_index(TABLE_COORDINATES)?;
        Ok((index, txn.coordinates(segment)?))
    }
}
