//! catalog-state — versioned state store for the service catalog.
//!
//! Backed by [redb](https://docs.rs/redb), which provides snapshot-isolated
//! read transactions and a single serialized writer. On top of it the store
//! adds:
//!
//! - a per-table modification index, stamped with the caller's log index
//!   on every committed write;
//! - watch sets for blocking queries, fired by commits that change rows,
//!   and [`blocking_query`] to wait for an index to advance;
//! - the node and network-coordinate tables, with deregistration
//!   cascading to coordinates;
//! - whole-store snapshots and validated bulk restore.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` and can be shared across
//! threads and async tasks.

pub mod blocking;
mod coordinates;
pub mod error;
mod nodes;
pub mod snapshot;
pub mod store;
pub mod tables;
pub mod txn;
pub mod types;
pub mod watch;

pub use blocking::blocking_query;
pub use error::{StateError, StateResult};
pub use snapshot::{Restore, Snapshot};
pub use store::StateStore;
pub use tables::{INDEX_APPLIED, TABLE_COORDINATES, TABLE_NODES};
pub use txn::{ReadTxn, WriteTxn};
pub use types::*;
pub use watch::{WatchKey, WatchSet};
