//! Dependency synchronization — decide which artifacts a worker needs.
//!
//! The scheduler remembers, per worker, the content hashes of the
//! artifacts that worker last received. Before each assignment it plans a
//! delta: any artifact whose current hash differs from the worker's
//! last-known hash is bundled into the outgoing message, everything else
//! is omitted. Planning a delta optimistically records the shipped hashes
//! as known; a worker that loses state reconnects with a fresh handle and
//! an empty hash set.

use std::collections::HashMap;

use matchgrid_proto::{ArtifactBlob, DependencyDelta};

use crate::error::ArtifactResult;
use crate::store::{Artifact, ArtifactStore, SharedArtifact};

/// Content hashes last shipped to one worker.
#[derive(Debug, Clone, Default)]
pub struct DependencyHashes {
    shared: HashMap<SharedArtifact, String>,
    maps: HashMap<String, String>,
    teams: HashMap<String, String>,
}

impl DependencyHashes {
    /// Fresh state for a new connection: nothing is known to be present.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Plan the delta for a match assignment on `map` between `team_a` and
/// `team_b`.
///
/// A read failure on any required artifact aborts the whole plan; the
/// caller must treat the assignment as failed rather than ship a
/// partial delta.
pub fn plan_match(
    store: &mut ArtifactStore,
    known: &mut DependencyHashes,
    map: &str,
    team_a: &str,
    team_b: &str,
) -> ArtifactResult<DependencyDelta> {
    let mut delta = plan_shared(store, known)?;

    delta.map = delta_for(
        known.maps.get(map).cloned(),
        store.map_hash(map)?,
        || store.load_map(map),
    )?;
    if let Some(blob) = &delta.map {
        known.maps.insert(map.to_string(), blob.hash.clone());
    }

    delta.team_a = delta_for(
        known.teams.get(team_a).cloned(),
        store.team_hash(team_a)?,
        || store.load_team(team_a),
    )?;
    if let Some(blob) = &delta.team_a {
        known.teams.insert(team_a.to_string(), blob.hash.clone());
    }

    delta.team_b = delta_for(
        known.teams.get(team_b).cloned(),
        store.team_hash(team_b)?,
        || store.load_team(team_b),
    )?;
    if let Some(blob) = &delta.team_b {
        known.teams.insert(team_b.to_string(), blob.hash.clone());
    }

    Ok(delta)
}

/// Plan the delta for a scrimmage analysis: shared artifacts only, since
/// the scrimmage file itself always ships with the assignment.
pub fn plan_scrimmage(
    store: &mut ArtifactStore,
    known: &mut DependencyHashes,
) -> ArtifactResult<DependencyDelta> {
    plan_shared(store, known)
}

fn plan_shared(
    store: &mut ArtifactStore,
    known: &mut DependencyHashes,
) -> ArtifactResult<DependencyDelta> {
    let mut delta = DependencyDelta::default();
    for kind in SharedArtifact::ALL {
        let current = store.shared_hash(kind)?;
        if known.shared.get(&kind) == Some(&current) {
            continue;
        }
        let artifact = store.load_shared(kind)?;
        known.shared.insert(kind, artifact.hash.clone());
        let blob = Some(to_blob(artifact));
        match kind {
            SharedArtifact::Engine => delta.engine = blob,
            SharedArtifact::AllowList => delta.allow_list = blob,
            SharedArtifact::DenyList => delta.deny_list = blob,
            SharedArtifact::CostTable => delta.cost_table = blob,
        }
    }
    Ok(delta)
}

fn delta_for(
    known: Option<String>,
    current: String,
    load: impl FnOnce() -> ArtifactResult<Artifact>,
) -> ArtifactResult<Option<ArtifactBlob>> {
    if known.as_deref() == Some(current.as_str()) {
        return Ok(None);
    }
    Ok(Some(to_blob(load()?)))
}

fn to_blob(artifact: Artifact) -> ArtifactBlob {
    ArtifactBlob {
        name: artifact.name,
        hash: artifact.hash,
        bytes: artifact.bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn populated_store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        for kind in SharedArtifact::ALL {
            fs::write(dir.path().join(kind.file_name()), kind.file_name()).unwrap();
        }
        fs::write(dir.path().join("maps/crossroads.xml"), b"<map/>").unwrap();
        fs::write(dir.path().join("teams/alpha.pkg"), b"alpha-code").unwrap();
        fs::write(dir.path().join("teams/beta.pkg"), b"beta-code").unwrap();
        (dir, store)
    }

    #[test]
    fn first_plan_ships_everything() {
        let (_dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();

        let delta = plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();
        assert!(delta.engine.is_some());
        assert!(delta.allow_list.is_some());
        assert!(delta.deny_list.is_some());
        assert!(delta.cost_table.is_some());
        assert!(delta.map.is_some());
        assert!(delta.team_a.is_some());
        assert!(delta.team_b.is_some());
    }

    #[test]
    fn second_plan_ships_nothing_when_unchanged() {
        let (_dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();

        plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();
        let delta = plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn changed_team_package_ships_again() {
        let (dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();

        plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();
        fs::write(dir.path().join("teams/alpha.pkg"), b"alpha-code-v2").unwrap();
        // Force an mtime difference on coarse-grained filesystems.
        let new_mtime = std::time::SystemTime::now() + std::time::Duration::from_secs(2);
        let file = fs::File::open(dir.path().join("teams/alpha.pkg")).unwrap();
        file.set_modified(new_mtime).unwrap();

        let delta = plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();
        assert!(delta.team_a.is_some());
        assert!(delta.team_b.is_none());
        assert!(delta.engine.is_none());
    }

    #[test]
    fn missing_team_package_aborts_plan() {
        let (_dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();

        let result = plan_match(&mut store, &mut known, "crossroads", "alpha", "ghost");
        assert!(result.is_err());
    }

    #[test]
    fn scrimmage_plan_covers_shared_only() {
        let (_dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();

        let delta = plan_scrimmage(&mut store, &mut known).unwrap();
        assert!(delta.engine.is_some());
        assert!(delta.map.is_none());
        assert!(delta.team_a.is_none());

        let again = plan_scrimmage(&mut store, &mut known).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn fresh_worker_state_reships_after_reconnect() {
        let (_dir, mut store) = populated_store();
        let mut known = DependencyHashes::new();
        plan_match(&mut store, &mut known, "crossroads", "alpha", "beta").unwrap();

        // Simulate a reconnect: a new handle starts with empty hashes.
        let mut fresh = DependencyHashes::new();
        let delta = plan_match(&mut store, &mut fresh, "crossroads", "alpha", "beta").unwrap();
        assert!(delta.engine.is_some());
    }
}
