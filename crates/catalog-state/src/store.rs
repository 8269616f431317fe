//! StateStore — redb-backed versioned tables for the catalog.
//!
//! redb gives every read transaction a frozen view of the last commit and
//! admits a single writer at a time. On top of that the store keeps a
//! per-table modification index and a registry of watch channels that
//! commits fire.

use std::path::Path;
use std::sync::Arc;

use catalog_core::config::StoreConfig;
use redb::{Database, ReadableDatabase};
use tracing::debug;

use crate::error::{StateResult, map_err};
use crate::tables::*;
use crate::txn::{ReadTxn, WriteTxn};
use crate::watch::{WatchKey, WatchSet, Watches};

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
    watches: Arc<Watches>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::with_database(db)?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::with_database(db)?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Open the store described by `config`: on disk when a data directory
    /// is set, in memory otherwise.
    pub fn from_config(config: &StoreConfig) -> StateResult<Self> {
        match config.db_path() {
            Some(path) => Self::open(&path),
            None => Self::open_in_memory(),
        }
    }

    fn with_database(db: Database) -> StateResult<Self> {
        let store = Self {
            db: Arc::new(db),
            watches: Arc::new(Watches::default()),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.open_table(COORDINATES).map_err(map_err!(Table))?;
        txn.open_table(INDEX).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Commit))?;
        Ok(())
    }

    // ── Transactions ───────────────────────────────────────────────

    /// Pin the current committed version for reading. Never blocks.
    pub fn begin_read(&self) -> StateResult<ReadTxn> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        Ok(ReadTxn::new(txn))
    }

    /// Start the write transaction for log position `index`.
    ///
    /// Blocks while another write transaction is open.
    pub fn begin_write(&self, index: u64) -> StateResult<WriteTxn> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        Ok(WriteTxn::new(txn, index, Arc::clone(&self.watches)))
    }

    /// Register `keys` in `ws` (if given), then pin a read version.
    ///
    /// Registering first means a commit racing with the read either shows
    /// up in the read or fires the registration.
    pub(crate) fn watched_read(
        &self,
        ws: Option<&mut WatchSet>,
        keys: impl IntoIterator<Item = WatchKey>,
    ) -> StateResult<ReadTxn> {
        if let Some(ws) = ws {
            for key in keys {
                ws.add(self.watches.subscribe(key));
            }
        }
        self.begin_read()
    }

    /// A watch set registered on a single key.
    #[cfg(test)]
    pub(crate) fn watch_key(&self, key: WatchKey) -> WatchSet {
        let mut ws = WatchSet::new();
        ws.add(self.watches.subscribe(key));
        ws
    }

    // ── Indexes ────────────────────────────────────────────────────

    /// Current index of a single table.
    pub fn table_index(&self, table: &str) -> StateResult<u64> {
        self.begin_read()?.table_index(table)
    }

    /// Current highest index among `tables`.
    pub fn max_index(&self, tables: &[&str]) -> StateResult<u64> {
        self.begin_read()?.max_index(tables)
    }

    /// Current highest index of any table.
    pub fn last_index(&self) -> StateResult<u64> {
        self.begin_read()?.last_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    #[test]
    fn fresh_store_has_zero_indexes() {
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.table_index(TABLE_NODES).unwrap(), 0);
        assert_eq!(store.table_index(TABLE_COORDINATES).unwrap(), 0);
        assert_eq!(store.last_index().unwrap(), 0);
        assert_eq!(store.table_index("no-such-table").unwrap(), 0);
    }

    #[test]
    fn commit_stamps_only_touched_tables() {
        let store = StateStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(7).unwrap();
        tx.touch(TABLE_COORDINATES);
        tx.commit().unwrap();

        assert_eq!(store.table_index(TABLE_COORDINATES).unwrap(), 7);
        assert_eq!(store.table_index(TABLE_NODES).unwrap(), 0);
        assert_eq!(store.max_index(&ROW_TABLES).unwrap(), 7);
    }

    #[test]
    fn aborted_write_leaves_no_trace() {
        let store = StateStore::open_in_memory().unwrap();
        let mut ws = WatchSet::new();
        store.nodes(Some(&mut ws)).unwrap();

        let mut tx = store.begin_write(3).unwrap();
        tx.ensure_node(&Node::new("n1", "10.0.0.1")).unwrap();
        tx.abort().unwrap();

        assert!(store.nodes(None).unwrap().1.is_empty());
        assert_eq!(store.table_index(TABLE_NODES).unwrap(), 0);
        assert!(!ws.fired());
    }

    #[test]
    fn dropped_write_is_rolled_back() {
        let store = StateStore::open_in_memory().unwrap();
        {
            let mut tx = store.begin_write(3).unwrap();
            tx.ensure_node(&Node::new("n1", "10.0.0.1")).unwrap();
        }
        assert!(store.get_node(None, "n1").unwrap().1.is_none());
        // The writer slot was released by the drop.
        store.ensure_node(4, &Node::new("n1", "10.0.0.1")).unwrap();
        assert_eq!(store.table_index(TABLE_NODES).unwrap(), 4);
    }

    #[test]
    fn readers_keep_their_version_during_writes() {
        let store = StateStore::open_in_memory().unwrap();
        store.ensure_node(1, &Node::new("n1", "10.0.0.1")).unwrap();

        let pinned = store.begin_read().unwrap();
        store.ensure_node(2, &Node::new("n2", "10.0.0.2")).unwrap();

        assert_eq!(pinned.table_index(TABLE_NODES).unwrap(), 1);
        assert_eq!(pinned.nodes().unwrap().len(), 1);
        assert_eq!(store.nodes(None).unwrap().1.len(), 2);
    }

    #[test]
    fn writers_are_serialized() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin_write(1).unwrap();

        let other = store.clone();
        let handle = std::thread::spawn(move || {
            // Blocks until the first writer commits.
            other.ensure_node(2, &Node::new("late", "10.0.0.9")).unwrap();
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(store.get_node(None, "late").unwrap().1.is_none());
        tx.commit().unwrap();

        handle.join().unwrap();
        assert!(store.get_node(None, "late").unwrap().1.is_some());
        assert_eq!(store.table_index(TABLE_NODES).unwrap(), 2);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.ensure_node(5, &Node::new("n1", "10.0.0.1")).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let (idx, node) = store.get_node(None, "n1").unwrap();
        assert_eq!(idx, 5);
        assert_eq!(node.unwrap().address, "10.0.0.1");
    }

    #[test]
    fn from_config_picks_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..StoreConfig::default()
        };
        let store = StateStore::from_config(&config).unwrap();
        store.ensure_node(1, &Node::new("n1", "10.0.0.1")).unwrap();
        assert!(dir.path().join("catalog.redb").exists());

        let memory = StateStore::from_config(&StoreConfig::default()).unwrap();
        assert!(memory.nodes(None).unwrap().1.is_empty());
    }
}
