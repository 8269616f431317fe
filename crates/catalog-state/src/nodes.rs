//! Node records and the deregistration cascade.

use redb::ReadableTable;
use tracing::debug;

use crate::error::{StateResult, map_err};
use crate::store::StateStore;
use crate::tables::*;
use crate::txn::{ReadTxn, WriteTxn};
use crate::types::Node;
use crate::watch::{WatchKey, WatchSet};

impl ReadTxn {
    /// Look up a node by name.
    pub fn node(&self, name: &str) -> StateResult<Option<Node>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let node: Node =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// All nodes, ordered by name.
    pub fn nodes(&self) -> StateResult<Vec<Node>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: Node =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(node);
        }
        Ok(results)
    }
}

impl WriteTxn {
    pub(crate) fn node_exists(&self, name: &str) -> StateResult<bool> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
        let exists = table.get(name).map_err(map_err!(Read))?.is_some();
        Ok(exists)
    }

    fn existing_node(&self, name: &str) -> StateResult<Option<Node>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(
                serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
            )),
            None => Ok(None),
        }
    }

    /// Write a node record exactly as given.
    pub(crate) fn put_node(&mut self, node: &Node) -> StateResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        {
            let mut table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
            table
                .insert(node.node.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        self.changed(WatchKey::Table(TABLE_NODES));
        self.changed(WatchKey::Prefix(TABLE_NODES, node.node.clone()));
        Ok(())
    }

    /// Register or update a node at this transaction's index.
    ///
    /// `create_index` is kept from an earlier registration; `modify_index`
    /// always becomes the transaction index.
    pub fn ensure_node(&mut self, node: &Node) -> StateResult<()> {
        let create_index = match self.existing_node(&node.node)? {
            Some(existing) => existing.create_index,
            None => self.index(),
        };
        let record = Node {
            create_index,
            modify_index: self.index(),
            ..node.clone()
        };
        self.put_node(&record)?;
        self.touch(TABLE_NODES);
        debug!(node = %record.node, index = self.index(), "node registered");
        Ok(())
    }

    /// Deregister a node and every coordinate it owns.
    ///
    /// Returns false, and changes nothing, when the node is unknown.
    pub fn delete_node(&mut self, name: &str) -> StateResult<bool> {
        let existed = {
            let mut table = self.txn.open_table(NODES).map_err(map_err!(Table))?;
            table.remove(name).map_err(map_err!(Write))?.is_some()
        };
        if !existed {
            debug!(node = %name, "delete of unknown node ignored");
            return Ok(false);
        }
        self.changed(WatchKey::Table(TABLE_NODES));
        self.changed(WatchKey::Prefix(TABLE_NODES, name.to_string()));
        self.touch(TABLE_NODES);

        let removed = self.delete_node_coordinates(name)?;
        debug!(node = %name, coordinates = removed, index = self.index(), "node deregistered");
        Ok(true)
    }
}

impl StateStore {
    /// Register or update a node at `index`.
    pub fn ensure_node(&self, index: u64, node: &Node) -> StateResult<()> {
        let mut tx = self.begin_write(index)?;
        tx.ensure_node(node)?;
        tx.commit()
    }

    /// Look up a node. Returns the nodes table index alongside.
    pub fn get_node(
        &self,
        ws: Option<&mut WatchSet>,
        name: &str,
    ) -> StateResult<(u64, Option<Node>)> {
        let txn = self.watched_read(ws, [WatchKey::Prefix(TABLE_NODES, name.to_string())])?;
        let index = txn.table_index(TABLE_NODES)?;
        Ok((index, txn.node(name)?))
    }

    /// All nodes ordered by name, with the nodes table index.
    pub fn nodes(&self, ws: Option<&mut WatchSet>) -> StateResult<(u64, Vec<Node>)> {
        let txn = self.watched_read(ws, [WatchKey::Table(TABLE_NODES)])?;
        let index = txn.table_index(TABLE_NODES)?;
        Ok((index, txn.nodes()?))
    }

    /// Deregister a node at `index`, cascading to its coordinates.
    pub fn delete_node(&self, index: u64, name: &str) -> StateResult<()> {
        let mut tx = self.begin_write(index)?;
        tx.delete_node(name)?;
        tx.commit()
    }
}
