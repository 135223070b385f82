//! ArtifactStore — the on-disk artifact root.
//!
//! Layout under the root directory:
//!
//! ```text
//! engine.bin            the shared engine binary
//! allow.list            package allow-list
//! deny.list             class deny-list
//! cost.table            instruction cost table
//! maps/<name>.xml       map files
//! teams/<name>.pkg      team packages, keyed by player name
//! scrimmages/<id>.bin   uploaded scrimmage files
//! results/<run>/<map>-<seed>.bin   raw match replays
//! ```
//!
//! Content hashes are sha-256 hex digests, cached per path and
//! invalidated by file mtime, so repeated dispatches do not re-hash
//! unchanged artifacts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ArtifactError, ArtifactResult};

/// The artifacts every assignment may depend on besides maps and teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedArtifact {
    Engine,
    AllowList,
    DenyList,
    CostTable,
}

impl SharedArtifact {
    /// File name of this artifact under the store root.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Engine => "engine.bin",
            Self::AllowList => "allow.list",
            Self::DenyList => "deny.list",
            Self::CostTable => "cost.table",
        }
    }

    /// All shared artifacts, in shipping order.
    pub const ALL: [SharedArtifact; 4] = [
        Self::Engine,
        Self::AllowList,
        Self::DenyList,
        Self::CostTable,
    ];
}

/// A staged engine update, applied when no run is active.
#[derive(Debug, Clone)]
pub struct EngineUpdate {
    pub engine: Vec<u8>,
    pub allow_list: Vec<u8>,
    pub deny_list: Vec<u8>,
    pub cost_table: Vec<u8>,
}

/// One loaded artifact: bytes plus content hash.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub hash: String,
    pub bytes: Vec<u8>,
}

/// Filesystem-backed artifact storage with hash caching.
pub struct ArtifactStore {
    root: PathBuf,
    /// Per-path hash cache, invalidated by mtime.
    hashes: HashMap<PathBuf, (SystemTime, String)>,
    /// Mtime of the maps directory at the last scan.
    maps_scanned_at: Option<SystemTime>,
    /// Engine update waiting for the active run to finish.
    pending_update: Option<EngineUpdate>,
}

impl ArtifactStore {
    /// Open the artifact root, creating the expected directories.
    pub fn open(root: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let root = root.into();
        for dir in ["maps", "teams", "scrimmages", "results"] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| ArtifactError::Write {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        debug!(root = %root.display(), "artifact store opened");
        Ok(Self {
            root,
            hashes: HashMap::new(),
            maps_scanned_at: None,
            pending_update: None,
        })
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Shared artifacts ───────────────────────────────────────────

    /// Current content hash of a shared artifact.
    pub fn shared_hash(&mut self, kind: SharedArtifact) -> ArtifactResult<String> {
        let path = self.root.join(kind.file_name());
        self.hash_of(&path)
    }

    /// Load a shared artifact's bytes and hash.
    pub fn load_shared(&mut self, kind: SharedArtifact) -> ArtifactResult<Artifact> {
        let path = self.root.join(kind.file_name());
        self.load(&path, kind.file_name())
    }

    // ── Maps ───────────────────────────────────────────────────────

    /// Current content hash of a map file.
    pub fn map_hash(&mut self, name: &str) -> ArtifactResult<String> {
        let path = self.map_path(name);
        self.hash_of(&path)
    }

    /// Load a map file's bytes and hash.
    pub fn load_map(&mut self, name: &str) -> ArtifactResult<Artifact> {
        let path = self.map_path(name);
        self.load(&path, name)
    }

    /// Scan the maps directory for `*.xml` files.
    ///
    /// Returns `None` when the directory mtime is unchanged since the
    /// last scan, otherwise the (name, hash) of every map file found.
    /// Unparseable directory entries are skipped with a warning.
    pub fn scan_maps(&mut self) -> ArtifactResult<Option<Vec<(String, String)>>> {
        let dir = self.root.join("maps");
        let mtime = fs::metadata(&dir)
            .and_then(|m| m.modified())
            .map_err(|e| ArtifactError::Read {
                path: dir.display().to_string(),
                source: e,
            })?;
        if self.maps_scanned_at == Some(mtime) {
            return Ok(None);
        }
        self.maps_scanned_at = Some(mtime);

        let entries = fs::read_dir(&dir).map_err(|e| ArtifactError::Read {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable maps entry");
                    continue;
                }
            };
            let path = entry.path();
            let is_map = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
            if !is_map {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.hash_of(&path) {
                Ok(hash) => found.push((name.to_string(), hash)),
                Err(e) => warn!(map = name, error = %e, "skipping unreadable map"),
            }
        }
        found.sort();
        debug!(count = found.len(), "maps directory scanned");
        Ok(Some(found))
    }

    // ── Team packages ──────────────────────────────────────────────

    /// Current content hash of a team package.
    pub fn team_hash(&mut self, name: &str) -> ArtifactResult<String> {
        let path = self.team_path(name);
        self.hash_of(&path)
    }

    /// Load a team package's bytes and hash.
    pub fn load_team(&mut self, name: &str) -> ArtifactResult<Artifact> {
        let path = self.team_path(name);
        self.load(&path, name)
    }

    /// True when the team package file exists.
    pub fn team_exists(&self, name: &str) -> bool {
        self.team_path(name).is_file()
    }

    // ── Scrimmage files ────────────────────────────────────────────

    /// Persist an uploaded scrimmage file.
    pub fn store_scrimmage(&self, id: u64, bytes: &[u8]) -> ArtifactResult<()> {
        let path = self.scrimmage_path(id);
        fs::write(&path, bytes).map_err(|e| ArtifactError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Read a stored scrimmage file.
    pub fn read_scrimmage(&self, id: u64) -> ArtifactResult<Vec<u8>> {
        let path = self.scrimmage_path(id);
        fs::read(&path).map_err(|e| ArtifactError::Read {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Delete a stored scrimmage file if present.
    pub fn delete_scrimmage(&self, id: u64) {
        let path = self.scrimmage_path(id);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "failed to delete scrimmage file");
        }
    }

    // ── Match replays ──────────────────────────────────────────────

    /// Write a raw match replay, keyed by (run, map, seed).
    pub fn write_replay(
        &self,
        run: u64,
        map: &str,
        seed: u64,
        bytes: &[u8],
    ) -> ArtifactResult<()> {
        let dir = self.root.join("results").join(run.to_string());
        fs::create_dir_all(&dir).map_err(|e| ArtifactError::Write {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = dir.join(format!("{map}-{seed}.bin"));
        fs::write(&path, bytes).map_err(|e| ArtifactError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Delete a stored replay if present.
    pub fn delete_replay(&self, run: u64, map: &str, seed: u64) {
        let path = self
            .root
            .join("results")
            .join(run.to_string())
            .join(format!("{map}-{seed}.bin"));
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "failed to delete replay");
        }
    }

    // ── Engine updates ─────────────────────────────────────────────

    /// Stage a new engine version. The caller applies it via
    /// [`apply_pending_update`](Self::apply_pending_update) once no run
    /// is active.
    pub fn stage_engine_update(&mut self, update: EngineUpdate) {
        info!("engine update staged");
        self.pending_update = Some(update);
    }

    /// True when an engine update is waiting to be applied.
    pub fn has_pending_update(&self) -> bool {
        self.pending_update.is_some()
    }

    /// Write the staged engine update to disk, if any. Returns true when
    /// an update was applied.
    pub fn apply_pending_update(&mut self) -> ArtifactResult<bool> {
        let Some(update) = self.pending_update.take() else {
            return Ok(false);
        };
        info!("applying staged engine update");
        self.write_shared(SharedArtifact::Engine, &update.engine)?;
        self.write_shared(SharedArtifact::AllowList, &update.allow_list)?;
        self.write_shared(SharedArtifact::DenyList, &update.deny_list)?;
        self.write_shared(SharedArtifact::CostTable, &update.cost_table)?;
        Ok(true)
    }

    fn write_shared(&mut self, kind: SharedArtifact, bytes: &[u8]) -> ArtifactResult<()> {
        let path = self.root.join(kind.file_name());
        fs::write(&path, bytes).map_err(|e| ArtifactError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        // The cache entry is stale now; drop it so the next hash request
        // re-reads the file.
        self.hashes.remove(&path);
        Ok(())
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn map_path(&self, name: &str) -> PathBuf {
        self.root.join("maps").join(format!("{name}.xml"))
    }

    fn team_path(&self, name: &str) -> PathBuf {
        self.root.join("teams").join(format!("{name}.pkg"))
    }

    fn scrimmage_path(&self, id: u64) -> PathBuf {
        self.root.join("scrimmages").join(format!("{id}.bin"))
    }

    fn load(&mut self, path: &Path, name: &str) -> ArtifactResult<Artifact> {
        let bytes = fs::read(path).map_err(|e| ArtifactError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let hash = hex::encode(Sha256::digest(&bytes));
        if let Ok(mtime) = fs::metadata(path).and_then(|m| m.modified()) {
            self.hashes.insert(path.to_path_buf(), (mtime, hash.clone()));
        }
        Ok(Artifact {
            name: name.to_string(),
            hash,
            bytes,
        })
    }

    /// Content hash of a file, served from the mtime-guarded cache when
    /// possible.
    fn hash_of(&mut self, path: &Path) -> ArtifactResult<String> {
        let mtime = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| ArtifactError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
        if let Some((cached_mtime, hash)) = self.hashes.get(path)
            && *cached_mtime == mtime
        {
            return Ok(hash.clone());
        }
        let bytes = fs::read(path).map_err(|e| ArtifactError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let hash = hex::encode(Sha256::digest(&bytes));
        self.hashes.insert(path.to_path_buf(), (mtime, hash.clone()));
        Ok(hash)
    }
}
