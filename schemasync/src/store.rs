//! Snapshot files on disk.
//!
//! A snapshot directory holds three files: the desired schema
//! (`schema.json`), the last applied one (`schema.current.json`) and a single
//! backup (`schema.previous.json`). Applying rotates current into the backup
//! slot; there is no deeper history.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SyncError};
use crate::keys::unkey_snapshot;
use crate::types::Snapshot;

pub const TARGET_FILE: &str = "schema.json";
pub const CURRENT_FILE: &str = "schema.current.json";
pub const PREVIOUS_FILE: &str = "schema.previous.json";

/// Default snapshot directory, relative to the working directory.
pub const DEFAULT_DIR: &str = "./directus";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self) -> PathBuf {
        self.dir.join(TARGET_FILE)
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn previous_path(&self) -> PathBuf {
        self.dir.join(PREVIOUS_FILE)
    }

    /// Load the desired schema.
    pub fn load_target(&self) -> Result<Snapshot> {
        load(&self.target_path())
    }

    /// Load the last applied schema.
    pub fn load_current(&self) -> Result<Snapshot> {
        load(&self.current_path())
    }

    /// Load the backup written by the last apply, if any.
    pub fn load_previous(&self) -> Result<Option<Snapshot>> {
        let path = self.previous_path();
        if !path.exists() {
            return Ok(None);
        }
        load(&path).map(Some)
    }

    /// Write `snapshot` as the current schema, without keys.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save_current(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.current_path();
        std::fs::create_dir_all(&self.dir).map_err(|err| SyncError::io(&self.dir, err))?;

        let mut json = serde_json::to_string_pretty(&unkey_snapshot(snapshot)).map_err(|source| {
            SyncError::MalformedSnapshot {
                path: path.clone(),
                source,
            }
        })?;
        json.push('\n');

        let mut temp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|err| SyncError::io(&self.dir, err))?;
        temp.write_all(json.as_bytes())
            .map_err(|err| SyncError::io(temp.path(), err))?;
        temp.persist(&path)
            .map_err(|err| SyncError::io(&path, err.error))?;

        log::info!("wrote {}", path.display());
        Ok(path)
    }

    /// Move the current schema into the backup slot, replacing an older backup.
    ///
    /// The rename overwrites the old backup in one step, so a backup exists
    /// at every point.
    pub fn rotate(&self) -> Result<PathBuf> {
        let current = self.current_path();
        let previous = self.previous_path();
        std::fs::rename(&current, &previous).map_err(|err| SyncError::io(&current, err))?;
        log::info!("moved {} to {}", current.display(), previous.display());
        Ok(previous)
    }
}

fn load(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path).map_err(|err| SyncError::io(path, err))?;
    serde_json::from_str(&content).map_err(|source| SyncError::MalformedSnapshot {
        path: path.to_path_buf(),
        source,
    })
}
