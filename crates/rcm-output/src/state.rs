//! Run state persisted between runs.
//!
//! The patient snapshot (every SCD2 version) and the surrogate-key registry
//! are the only things a run reads from a previous one. Both are JSON files
//! in the state directory, replaced atomically after a successful run.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use rcm_core::{KeyRegistry, PatientVersion};

use crate::error::StateError;

pub const SNAPSHOT_FILE: &str = "patients_snapshot.json";
pub const REGISTRY_FILE: &str = "key_registry.json";

/// State carried into a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorState {
    pub snapshot: Vec<PatientVersion>,
    pub registry: KeyRegistry,
}

impl PriorState {
    pub fn is_first_run(&self) -> bool {
        self.snapshot.is_empty() && self.registry.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    /// The saved patient snapshot, `Ok(None)` before the first run.
    pub fn load_snapshot(&self) -> Result<Option<Vec<PatientVersion>>, StateError> {
        read_json(&self.snapshot_path())
    }

    /// The saved key registry, `Ok(None)` before the first run.
    pub fn load_registry(&self) -> Result<Option<KeyRegistry>, StateError> {
        read_json(&self.registry_path())
    }

    /// Both state files, empty when absent.
    pub fn load(&self) -> Result<PriorState, StateError> {
        let state = PriorState {
            snapshot: self.load_snapshot()?.unwrap_or_default(),
            registry: self.load_registry()?.unwrap_or_default(),
        };
        info!(
            versions = state.snapshot.len(),
            first_run = state.is_first_run(),
            dir = %self.dir.display(),
            "loaded run state"
        );
        Ok(state)
    }

    /// Replace both state files.
    ///
    /// The registry goes first. If the snapshot write then fails, the next run
    /// sees the old snapshot with a registry whose high-water marks have only
    /// moved forward, so no surrogate key is handed out twice.
    pub fn save(&self, snapshot: &[PatientVersion], registry: &KeyRegistry) -> Result<(), StateError> {
        write_json_atomic(&self.registry_path(), registry)?;
        write_json_atomic(&self.snapshot_path(), snapshot)?;
        info!(versions = snapshot.len(), dir = %self.dir.display(), "saved run state");
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StateError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StateError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Temp file plus rename, so a crash never leaves half a state file.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StateError> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|source| StateError::Serialization { source })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StateError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let io_error = |operation: &'static str| {
        let temp_path = temp_path.clone();
        move |source: std::io::Error| StateError::Io {
            operation,
            path: temp_path,
            source,
        }
    };
    let mut file = File::create(&temp_path).map_err(io_error("create"))?;
    file.write_all(&bytes).map_err(io_error("write"))?;
    file.sync_all().map_err(io_error("sync"))?;

    fs::rename(&temp_path, path).map_err(|source| StateError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source,
    })
}
