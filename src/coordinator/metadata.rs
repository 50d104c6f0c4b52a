//! Metadata snapshot persistence
//!
//! The coordinator keeps its whole state (datanode heartbeats, file metadata,
//! block assignments) in memory and rewrites it as one JSON document after
//! every successful assignment. Writes go to `<path>.tmp` first and are then
//! renamed onto `<path>`, so the canonical file is always a complete earlier
//! snapshot, never a torn write.
//!
//! Loading is fail-open: a missing file is a cold start, and an unreadable
//! one is moved aside to `<path>.corrupt-<unix-secs>` before starting empty.

use crate::common::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Per-file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    pub total_blocks: u64,
    pub created_at: DateTime<Utc>,
    pub replication_factor: usize,
    /// Block size the file was split with
    #[serde(default)]
    pub block_size: u64,
    /// Block ids in file order
    #[serde(default)]
    pub block_ids: Vec<String>,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// node id -> last heartbeat, in first-seen order
    #[serde(default)]
    pub active_datanodes: IndexMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub file_metadata: IndexMap<String, FileMetadata>,
    /// block id -> replica node ids
    #[serde(default)]
    pub block_assignments: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of reading the snapshot at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No snapshot on disk.
    ColdStart,
    Loaded(MetadataSnapshot),
    /// Snapshot existed but could not be read; state starts empty.
    Corrupt {
        reason: String,
        preserved_at: Option<PathBuf>,
    },
}

impl LoadOutcome {
    pub fn into_snapshot(self) -> MetadataSnapshot {
        match self {
            LoadOutcome::Loaded(snapshot) => snapshot,
            LoadOutcome::ColdStart | LoadOutcome::Corrupt { .. } => MetadataSnapshot::default(),
        }
    }
}

/// Snapshot file store
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Open a store rooted at `path`, creating its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        suffixed(&self.path, ".tmp")
    }

    /// Atomically replace the canonical snapshot.
    pub fn persist(&self, snapshot: &MetadataSnapshot) -> Result<()> {
        let staging = self.staging_path();
        if let Err(e) = write_synced(&staging, snapshot).and_then(|()| {
            fs::rename(&staging, &self.path)?;
            Ok(())
        }) {
            if let Err(cleanup) = fs::remove_file(&staging) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %staging.display(), "Failed to remove staging snapshot: {}", cleanup);
                }
            }
            return Err(e);
        }

        tracing::debug!(
            path = %self.path.display(),
            files = snapshot.file_metadata.len(),
            blocks = snapshot.block_assignments.len(),
            "Metadata snapshot persisted"
        );
        Ok(())
    }

    /// Read the snapshot. Never fails: problems degrade to an empty state.
    pub fn load(&self) -> LoadOutcome {
        let staging = self.staging_path();
        if staging.exists() {
            tracing::warn!(path = %staging.display(), "Removing leftover staging snapshot");
            if let Err(e) = fs::remove_file(&staging) {
                tracing::warn!(path = %staging.display(), "Failed to remove staging snapshot: {}", e);
            }
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No metadata snapshot found, cold start");
                return LoadOutcome::ColdStart;
            }
            Err(e) => return self.quarantine(e.to_string()),
        };

        match serde_json::from_slice::<MetadataSnapshot>(&bytes) {
            Ok(snapshot) => {
                tracing::info!(
                    path = %self.path.display(),
                    datanodes = snapshot.active_datanodes.len(),
                    files = snapshot.file_metadata.len(),
                    blocks = snapshot.block_assignments.len(),
                    "Loaded metadata snapshot"
                );
                LoadOutcome::Loaded(snapshot)
            }
            Err(e) => self.quarantine(e.to_string()),
        }
    }

    fn quarantine(&self, reason: String) -> LoadOutcome {
        let target = suffixed(
            &self.path,
            &format!(".corrupt-{}", Utc::now().timestamp()),
        );
        let preserved_at = match fs::rename(&self.path, &target) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Could not preserve unreadable snapshot: {}", e);
                None
            }
        };
        tracing::error!(
            path = %self.path.display(),
            preserved_at = ?preserved_at,
            "Metadata snapshot unreadable ({}), starting with empty state",
            reason
        );
        LoadOutcome::Corrupt {
            reason,
            preserved_at,
        }
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_synced(path: &Path, snapshot: &MetadataSnapshot) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_snapshot() -> MetadataSnapshot {
        let now = Utc::now();
        let mut snapshot = MetadataSnapshot::default();
        snapshot.active_datanodes.insert("dn-2".into(), now);
        snapshot.active_datanodes.insert("dn-1".into(), now);
        snapshot.file_metadata.insert(
            "notes.txt".into(),
            FileMetadata {
                size: 10,
                total_blocks: 1,
                created_at: now,
                replication_factor: 2,
                block_size: 32,
                block_ids: vec!["block_notes_txt_0000_abcdef01".into()],
            },
        );
        snapshot.block_assignments.insert(
            "block_notes_txt_0000_abcdef01".into(),
            vec!["dn-2".into(), "dn-1".into()],
        );
        snapshot.last_updated = Some(now);
        snapshot
    }

    #[test]
    fn test_persist_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("meta/metadata.json")).unwrap();
        let snapshot = sample_snapshot();

        store.persist(&snapshot).unwrap();
        assert!(!store.staging_path().exists());

        match store.load() {
            LoadOutcome::Loaded(loaded) => {
                assert_eq!(loaded, snapshot);
                let order: Vec<&String> = loaded.active_datanodes.keys().collect();
                assert_eq!(order, vec!["dn-2", "dn-1"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_document_keys() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();
        store.persist(&sample_snapshot()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        for key in [
            "active_datanodes",
            "file_metadata",
            "block_assignments",
            "last_updated",
        ] {
            assert!(raw.get(key).is_some(), "missing key {}", key);
        }
        assert!(raw["active_datanodes"]["dn-1"].is_string());
    }

    #[test]
    fn test_cold_start() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();
        assert!(matches!(store.load(), LoadOutcome::ColdStart));
    }

    #[test]
    fn test_corrupt_snapshot_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = MetadataStore::open(&path).unwrap();

        match store.load() {
            LoadOutcome::Corrupt { preserved_at, .. } => {
                let preserved = preserved_at.unwrap();
                assert_eq!(fs::read(&preserved).unwrap(), b"{ not json");
                assert!(!path.exists());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // the next start is a plain cold start
        assert!(matches!(store.load(), LoadOutcome::ColdStart));
    }

    #[test]
    fn test_failed_persist_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let store = MetadataStore::open(&path).unwrap();
        let first = sample_snapshot();
        store.persist(&first).unwrap();

        // a directory in the staging slot makes File::create fail
        fs::create_dir(store.staging_path()).unwrap();
        let mut second = first.clone();
        second.file_metadata.clear();
        assert!(store.persist(&second).is_err());
        fs::remove_dir(store.staging_path()).unwrap();

        assert_eq!(store.load().into_snapshot(), first);
    }

    #[test]
    fn test_unremovable_staging_path_does_not_block_load() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();
        let snapshot = sample_snapshot();
        store.persist(&snapshot).unwrap();
        fs::create_dir(store.staging_path()).unwrap();

        assert_eq!(store.load().into_snapshot(), snapshot);
        assert!(store.staging_path().is_dir());
    }

    #[test]
    fn test_leftover_staging_file_is_ignored() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("metadata.json")).unwrap();
        let snapshot = sample_snapshot();
        store.persist(&snapshot).unwrap();
        fs::write(store.staging_path(), b"partial").unwrap();

        assert_eq!(store.load().into_snapshot(), snapshot);
        assert!(!store.staging_path().exists());
    }
}
