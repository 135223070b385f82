//! Domain types for the MatchGrid state store.
//!
//! These types represent the persisted state of runs, matches, scrimmage
//! sets, players, and the map catalog. All types are serializable to/from
//! JSON for storage in redb tables.

use serde::{Deserialize, Serialize};

/// Unique identifier for a run.
pub type RunId = u64;

/// Unique identifier for a match within a run.
pub type MatchId = u64;

/// Unique identifier for a scrimmage set.
pub type ScrimmageId = u64;

/// Unique identifier for a registered player.
pub type PlayerId = u64;

/// Unique identifier for a catalogued map.
pub type MapId = u64;

// ── Run ────────────────────────────────────────────────────────────

/// One head-to-head contest between two players across a map x seed grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub team_a: PlayerId,
    pub team_b: PlayerId,
    pub status: RunStatus,
    /// Unix timestamp (seconds) when the run was promoted to RUNNING.
    pub started: Option<u64>,
    /// Unix timestamp (seconds) when the run reached a terminal status.
    pub ended: Option<u64>,
    /// Matches won by team A so far.
    pub a_wins: u32,
    /// Matches won by team B so far.
    pub b_wins: u32,
}

/// Lifecycle status of a run.
///
/// At most one run is `Running` at any time. `Running -> Canceled` is the
/// only externally triggered transition; the rest are scheduler-internal.
/// No transition leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Complete,
    Error,
    Canceled,
}

impl RunStatus {
    /// True for `Complete`, `Error`, and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Canceled)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

// ── Match ──────────────────────────────────────────────────────────

/// One (map, seed) execution unit belonging to a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: MatchId,
    pub run: RunId,
    pub map: MapId,
    pub seed: u64,
    pub status: MatchStatus,
    pub result: Option<MatchResult>,
}

/// Status of a match or scrimmage set.
///
/// Transitions are monotonic: `Queued -> Running -> Complete`. A `Running`
/// match stays re-dispatchable (redundancy-eligible) until it completes;
/// there is no explicit reversion to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Queued,
    Running,
    Complete,
}

/// Outcome of a finished match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub winner: Team,
    pub condition: WinCondition,
    pub rounds: u64,
}

/// Which side of a run a result refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    A,
    B,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// How a match was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    /// The losing program was eliminated outright.
    Elimination,
    /// Decided on points at the round limit.
    Score,
    /// Decided by the engine's tiebreak rule.
    Tiebreak,
}

// ── ScrimmageSet ───────────────────────────────────────────────────

/// A previously played match file submitted for post-hoc analysis.
///
/// Scrimmage sets are independent of runs and queue in a separate,
/// lower-priority pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrimmageSet {
    pub id: ScrimmageId,
    /// Original upload file name, for display only.
    pub file_name: String,
    pub status: MatchStatus,
    pub result: Option<ScrimmageAnalysis>,
    /// Unix timestamp (seconds) of the upload.
    pub submitted_at: u64,
}

/// Statistical analysis extracted from a scrimmage file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrimmageAnalysis {
    pub winner: Team,
    pub rounds: u64,
    /// Map name recorded in the scrimmage file.
    pub map: String,
}

// ── Player ─────────────────────────────────────────────────────────

/// A registered contestant. The name doubles as the team package name in
/// the artifact store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Unix timestamp (seconds) of registration.
    pub registered_at: u64,
}

// ── Map catalog ────────────────────────────────────────────────────

/// A map known to the catalog, discovered from the artifact store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapInfo {
    pub id: MapId,
    pub name: String,
    /// Content hash of the map file when it was last scanned.
    pub hash: String,
    /// Unix timestamp (seconds) of first discovery.
    pub discovered_at: u64,
}
