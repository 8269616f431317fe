//! redb table definitions for the catalog state store.
//!
//! Row values are JSON-serialized domain types. Coordinates use a
//! `(node, segment)` tuple key so a node's rows sort together and can be
//! scanned as a range.

use redb::TableDefinition;

/// Name of the nodes table, also its key in [`INDEX`].
pub const TABLE_NODES: &str = "nodes";

/// Name of the coordinates table, also its key in [`INDEX`].
pub const TABLE_COORDINATES: &str = "coordinates";

/// Node records keyed by node name.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new(TABLE_NODES);

/// Coordinates keyed by `(node, segment)`.
pub const COORDINATES: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new(TABLE_COORDINATES);

/// Last modification index per table, keyed by table name.
pub const INDEX: TableDefinition<&str, u64> = TableDefinition::new("index");

/// [`INDEX`] entry holding the last applied log position, which can run
/// ahead of every table when an entry changed nothing.
pub const INDEX_APPLIED: &str = "applied";

/// Every table holding rows, in snapshot order.
pub const ROW_TABLES: [&str; 2] = [TABLE_NODES, TABLE_COORDINATES];
