//! Wire-format message types for the scheduler <-> worker protocol.
//!
//! Messages are serialized with MessagePack for compact, fast transport;
//! binary artifact payloads ride along as raw byte blobs. One persistent
//! connection per worker carries both directions.

use serde::{Deserialize, Serialize};

use matchgrid_state::{MatchId, MatchResult, RunId, ScrimmageAnalysis, ScrimmageId};

/// Messages sent from the scheduler to a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ToWorker {
    /// Run one match. `deps` carries only the artifacts the worker is
    /// missing; everything else is addressed by name and already on disk
    /// worker-side.
    Assign {
        match_id: MatchId,
        run_id: RunId,
        map: String,
        seed: u64,
        team_a: String,
        team_b: String,
        deps: DependencyDelta,
    },

    /// Analyze one scrimmage file. The file itself is always included
    /// since it is not name-addressable on the worker.
    AssignScrimmage {
        scrimmage_id: ScrimmageId,
        file_name: String,
        #[serde(with = "raw_bytes")]
        file: Vec<u8>,
        deps: DependencyDelta,
    },

    /// Drop everything currently assigned and discard partial output.
    StopAll,
}

/// Messages sent from a worker to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FromWorker {
    /// First message on every connection. A worker accepts no work until
    /// its capacity is known.
    Handshake { capacity: u32 },

    /// A match finished (successfully or not). `result` and `replay` are
    /// only meaningful when `outcome` is `Success`.
    Completed {
        match_id: MatchId,
        outcome: ReportOutcome,
        result: Option<MatchResult>,
        #[serde(with = "raw_bytes")]
        replay: Vec<u8>,
    },

    /// A scrimmage analysis finished.
    ScrimmageCompleted {
        scrimmage_id: ScrimmageId,
        outcome: ReportOutcome,
        result: Option<ScrimmageAnalysis>,
    },
}

/// Whether the worker considers the job done or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportOutcome {
    Success,
    Failed,
}

/// The artifacts a specific assignment must ship to the worker.
///
/// Each field is `Some` only when the worker's last-acknowledged hash
/// differs from the current on-disk artifact; `None` means "you already
/// have the right version".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyDelta {
    pub engine: Option<ArtifactBlob>,
    pub allow_list: Option<ArtifactBlob>,
    pub deny_list: Option<ArtifactBlob>,
    pub cost_table: Option<ArtifactBlob>,
    pub map: Option<ArtifactBlob>,
    pub team_a: Option<ArtifactBlob>,
    pub team_b: Option<ArtifactBlob>,
}

impl DependencyDelta {
    /// True when nothing needs to be shipped.
    pub fn is_empty(&self) -> bool {
        self.engine.is_none()
            && self.allow_list.is_none()
            && self.deny_list.is_none()
            && self.cost_table.is_none()
            && self.map.is_none()
            && self.team_a.is_none()
            && self.team_b.is_none()
    }
}

/// One artifact payload: name, content hash, and the bytes themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactBlob {
    pub name: String,
    pub hash: String,
    #[serde(with = "raw_bytes")]
    pub bytes: Vec<u8>,
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod raw_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchgrid_state::{Team, WinCondition};

    #[test]
    fn assign_roundtrip() {
        let msg = ToWorker::Assign {
            match_id: 7,
            run_id: 3,
            map: "crossroads".to_string(),
            seed: 42,
            team_a: "alpha".to_string(),
            team_b: "beta".to_string(),
            deps: DependencyDelta {
                map: Some(ArtifactBlob {
                    name: "crossroads".to_string(),
                    hash: "deadbeef".to_string(),
                    bytes: vec![1, 2, 3],
                }),
                ..Default::default()
            },
        };

        let bytes = rmp_serde::to_vec(&msg).unwrap();
        let decoded: ToWorker = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn completed_roundtrip_with_replay() {
        let msg = FromWorker::Completed {
            match_id: 7,
            outcome: ReportOutcome::Success,
            result: Some(MatchResult {
                winner: Team::A,
                condition: WinCondition::Elimination,
                rounds: 512,
            }),
            replay: vec![0u8; 128],
        };

        let bytes = rmp_serde::to_vec(&msg).unwrap();
        let decoded: FromWorker = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn empty_delta_is_empty() {
        assert!(DependencyDelta::default().is_empty());

        let delta = DependencyDelta {
            engine: Some(ArtifactBlob {
                name: "engine.bin".to_string(),
                hash: "aa".to_string(),
                bytes: vec![0],
            }),
            ..Default::default()
        };
        assert!(!delta.is_empty());
    }
}
