//! redb table definitions for the MatchGrid state store.
//!
//! Entity tables use `u64` ids as keys and JSON-serialized domain types
//! as values. The counters table hands out monotonically increasing ids
//! per entity kind.

use redb::TableDefinition;

/// Runs keyed by run id.
pub const RUNS: TableDefinition<u64, &[u8]> = TableDefinition::new("runs");

/// Matches keyed by match id.
pub const MATCHES: TableDefinition<u64, &[u8]> = TableDefinition::new("matches");

/// Scrimmage sets keyed by scrimmage id.
pub const SCRIMMAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("scrimmages");

/// Players keyed by player id.
pub const PLAYERS: TableDefinition<u64, &[u8]> = TableDefinition::new("players");

/// Map catalog keyed by map id.
pub const MAPS: TableDefinition<u64, &[u8]> = TableDefinition::new("maps");

/// Next-id counters keyed by entity kind ("run", "match", ...).
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");
