//! StateStore — redb-backed state persistence for MatchGrid.
//!
//! Provides typed CRUD operations over runs, matches, scrimmage sets,
//! players, and the map catalog. All values are JSON-serialized into
//! redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).
//!
//! Entities are plain value structs; there are no lazy collections or
//! cascades. Deleting a run's matches is an explicit per-match delete
//! issued by the caller.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(RUNS).map_err(map_err!(Table))?;
        txn.open_table(MATCHES).map_err(map_err!(Table))?;
        txn.open_table(SCRIMMAGES).map_err(map_err!(Table))?;
        txn.open_table(PLAYERS).map_err(map_err!(Table))?;
        txn.open_table(MAPS).map_err(map_err!(Table))?;
        txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Allocate the next id for an entity kind ("run", "match", ...).
    ///
    /// Ids start at 1 and increase monotonically per kind.
    pub fn next_id(&self, kind: &str) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let id;
        {
            let mut table = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let current = table
                .get(kind)
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .unwrap_or(0);
            id = current + 1;
            table.insert(kind, id).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(id)
    }

    // ── Runs ───────────────────────────────────────────────────────

    /// Insert or update a run.
    pub fn put_run(&self, run: &Run) -> StateResult<()> {
        self.put(RUNS, run.id, run)
    }

    /// Get a run by id.
    pub fn get_run(&self, id: RunId) -> StateResult<Option<Run>> {
        self.get(RUNS, id)
    }

    /// Delete a run by id. Returns true if it existed.
    pub fn delete_run(&self, id: RunId) -> StateResult<bool> {
        self.delete(RUNS, id)
    }

    /// List all runs in id order.
    pub fn list_runs(&self) -> StateResult<Vec<Run>> {
        self.list(RUNS)
    }

    /// Find the first run with the given status, in id order.
    ///
    /// With `RunStatus::Running` this returns the single active run, if
    /// any; with `RunStatus::Queued` it returns the oldest queued run.
    pub fn find_run_by_status(&self, status: RunStatus) -> StateResult<Option<Run>> {
        let runs: Vec<Run> = self.list(RUNS)?;
        Ok(runs.into_iter().find(|r| r.status == status))
    }

    // ── Matches ────────────────────────────────────────────────────

    /// Insert or update a match.
    pub fn put_match(&self, m: &Match) -> StateResult<()> {
        self.put(MATCHES, m.id, m)
    }

    /// Get a match by id.
    pub fn get_match(&self, id: MatchId) -> StateResult<Option<Match>> {
        self.get(MATCHES, id)
    }

    /// Delete a match by id. Returns true if it existed.
    pub fn delete_match(&self, id: MatchId) -> StateResult<bool> {
        self.delete(MATCHES, id)
    }

    /// All matches belonging to a run, in id order.
    pub fn matches_for_run(&self, run: RunId) -> StateResult<Vec<Match>> {
        let all: Vec<Match> = self.list(MATCHES)?;
        Ok(all.into_iter().filter(|m| m.run == run).collect())
    }

    /// Matches of a run with the given status, in id order.
    pub fn matches_for_run_by_status(
        &self,
        run: RunId,
        status: MatchStatus,
    ) -> StateResult<Vec<Match>> {
        let all = self.matches_for_run(run)?;
        Ok(all.into_iter().filter(|m| m.status == status).collect())
    }

    /// Total number of matches in a run.
    pub fn count_matches_for_run(&self, run: RunId) -> StateResult<u64> {
        Ok(self.matches_for_run(run)?.len() as u64)
    }

    /// Number of matches of a run with the given status.
    pub fn count_matches_for_run_by_status(
        &self,
        run: RunId,
        status: MatchStatus,
    ) -> StateResult<u64> {
        Ok(self.matches_for_run_by_status(run, status)?.len() as u64)
    }

    // ── Scrimmage sets ─────────────────────────────────────────────

    /// Insert or update a scrimmage set.
    pub fn put_scrimmage(&self, s: &ScrimmageSet) -> StateResult<()> {
        self.put(SCRIMMAGES, s.id, s)
    }

    /// Get a scrimmage set by id.
    pub fn get_scrimmage(&self, id: ScrimmageId) -> StateResult<Option<ScrimmageSet>> {
        self.get(SCRIMMAGES, id)
    }

    /// Delete a scrimmage set by id. Returns true if it existed.
    pub fn delete_scrimmage(&self, id: ScrimmageId) -> StateResult<bool> {
        self.delete(SCRIMMAGES, id)
    }

    /// List all scrimmage sets in id order.
    pub fn list_scrimmages(&self) -> StateResult<Vec<ScrimmageSet>> {
        self.list(SCRIMMAGES)
    }

    /// Scrimmage sets with the given status, in id order.
    pub fn scrimmages_by_status(&self, status: MatchStatus) -> StateResult<Vec<ScrimmageSet>> {
        let all: Vec<ScrimmageSet> = self.list(SCRIMMAGES)?;
        Ok(all.into_iter().filter(|s| s.status == status).collect())
    }

    // ── Players ────────────────────────────────────────────────────

    /// Insert or update a player.
    pub fn put_player(&self, p: &Player) -> StateResult<()> {
        self.put(PLAYERS, p.id, p)
    }

    /// Get a player by id.
    pub fn get_player(&self, id: PlayerId) -> StateResult<Option<Player>> {
        self.get(PLAYERS, id)
    }

    /// Look up a player by name.
    pub fn find_player_by_name(&self, name: &str) -> StateResult<Option<Player>> {
        let players: Vec<Player> = self.list(PLAYERS)?;
        Ok(players.into_iter().find(|p| p.name == name))
    }

    /// List all players in id order.
    pub fn list_players(&self) -> StateResult<Vec<Player>> {
        self.list(PLAYERS)
    }

    // ── Map catalog ────────────────────────────────────────────────

    /// Insert or update a catalogued map.
    pub fn put_map(&self, m: &MapInfo) -> StateResult<()> {
        self.put(MAPS, m.id, m)
    }

    /// Get a map by id.
    pub fn get_map(&self, id: MapId) -> StateResult<Option<MapInfo>> {
        self.get(MAPS, id)
    }

    /// Look up a map by name.
    pub fn find_map_by_name(&self, name: &str) -> StateResult<Option<MapInfo>> {
        let maps: Vec<MapInfo> = self.list(MAPS)?;
        Ok(maps.into_iter().find(|m| m.name == name))
    }

    /// List all catalogued maps in id order.
    pub fn list_maps(&self) -> StateResult<Vec<MapInfo>> {
        self.list(MAPS)
    }

    // ── Generic CRUD over u64-keyed tables ─────────────────────────

    fn put<T: serde::Serialize>(
        &self,
        table: redb::TableDefinition<u64, &'static [u8]>,
        key: u64,
        value: &T,
    ) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            t.insert(key, bytes.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        table: redb::TableDefinition<u64, &'static [u8]>,
        key: u64,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        match t.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, table: redb::TableDefinition<u64, &'static [u8]>, key: u64) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            existed = t.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    fn list<T: serde::de::DeserializeOwned>(
        &self,
        table: redb::TableDefinition<u64, &'static [u8]>,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        // redb iterates in key order, so id order falls out for free.
        for entry in t.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let item = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(item);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> StateStore {
        StateStore::open_in_memory().unwrap()
    }

    fn test_run(id: RunId) -> Run {
        Run {
            id,
            team_a: 1,
            team_b: 2,
            status: RunStatus::Queued,
            started: None,
            ended: None,
            a_wins: 0,
            b_wins: 0,
        }
    }

    fn test_match(id: MatchId, run: RunId, status: MatchStatus) -> Match {
        Match {
            id,
            run,
            map: 1,
            seed: 42,
            status,
            result: None,
        }
    }

    #[test]
    fn next_id_is_monotonic_per_kind() {
        let store = test_store();
        assert_eq!(store.next_id("run").unwrap(), 1);
        assert_eq!(store.next_id("run").unwrap(), 2);
        assert_eq!(store.next_id("match").unwrap(), 1);
        assert_eq!(store.next_id("run").unwrap(), 3);
    }

    #[test]
    fn run_roundtrip() {
        let store = test_store();
        let run = test_run(1);
        store.put_run(&run).unwrap();

        let fetched = store.get_run(1).unwrap().unwrap();
        assert_eq!(fetched, run);
        assert!(store.get_run(99).unwrap().is_none());
    }

    #[test]
    fn delete_run_reports_existence() {
        let store = test_store();
        store.put_run(&test_run(1)).unwrap();

        assert!(store.delete_run(1).unwrap());
        assert!(!store.delete_run(1).unwrap());
    }

    #[test]
    fn find_run_by_status_picks_oldest() {
        let store = test_store();
        store.put_run(&test_run(3)).unwrap();
        store.put_run(&test_run(1)).unwrap();
        let mut running = test_run(2);
        running.status = RunStatus::Running;
        store.put_run(&running).unwrap();

        let queued = store.find_run_by_status(RunStatus::Queued).unwrap().unwrap();
        assert_eq!(queued.id, 1);
        let active = store.find_run_by_status(RunStatus::Running).unwrap().unwrap();
        assert_eq!(active.id, 2);
    }

    #[test]
    fn matches_filter_by_run_and_status() {
        let store = test_store();
        store.put_match(&test_match(1, 1, MatchStatus::Queued)).unwrap();
        store.put_match(&test_match(2, 1, MatchStatus::Complete)).unwrap();
        store.put_match(&test_match(3, 2, MatchStatus::Queued)).unwrap();

        assert_eq!(store.matches_for_run(1).unwrap().len(), 2);
        assert_eq!(
            store
                .matches_for_run_by_status(1, MatchStatus::Queued)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.count_matches_for_run(1).unwrap(), 2);
        assert_eq!(
            store
                .count_matches_for_run_by_status(1, MatchStatus::Complete)
                .unwrap(),
            1
        );
    }

    #[test]
    fn scrimmages_by_status() {
        let store = test_store();
        let queued = ScrimmageSet {
            id: 1,
            file_name: "upload.bin".to_string(),
            status: MatchStatus::Queued,
            result: None,
            submitted_at: 1000,
        };
        let mut running = queued.clone();
        running.id = 2;
        running.status = MatchStatus::Running;
        store.put_scrimmage(&queued).unwrap();
        store.put_scrimmage(&running).unwrap();

        let qs = store.scrimmages_by_status(MatchStatus::Queued).unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].id, 1);
    }

    #[test]
    fn player_lookup_by_name() {
        let store = test_store();
        let player = Player {
            id: 1,
            name: "alpha".to_string(),
            registered_at: 1000,
        };
        store.put_player(&player).unwrap();

        assert_eq!(
            store.find_player_by_name("alpha").unwrap().unwrap().id,
            1
        );
        assert!(store.find_player_by_name("beta").unwrap().is_none());
    }

    #[test]
    fn map_lookup_by_name() {
        let store = test_store();
        let map = MapInfo {
            id: 1,
            name: "crossroads".to_string(),
            hash: "abc123".to_string(),
            discovered_at: 1000,
        };
        store.put_map(&map).unwrap();

        assert_eq!(
            store.find_map_by_name("crossroads").unwrap().unwrap().id,
            1
        );
        assert!(store.find_map_by_name("islands").unwrap().is_none());
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");
        {
            let store = StateStore::open(&path).unwrap();
            store.put_run(&test_run(1)).unwrap();
        }
        let store = StateStore::open(&path).unwrap();
        assert!(store.get_run(1).unwrap().is_some());
    }
}
