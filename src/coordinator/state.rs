//! Coordinator state: the single owner of liveness, file metadata and block
//! assignments.
//!
//! Every read and write goes through one `CoordinatorState` behind one mutex
//! ([`SharedState`]). An assignment reads the available nodes, records the
//! placement and persists the snapshot without releasing the lock, so the
//! snapshot never captures a half-applied upload.

use crate::common::{CoordinatorConfig, Error, Result};
use crate::coordinator::liveness::{HeartbeatOutcome, LivenessTracker, NodeStatus};
use crate::coordinator::metadata::{FileMetadata, MetadataSnapshot, MetadataStore};
use crate::coordinator::placement::{BlockPlacement, PlacementManager};
use crate::coordinator::splitter::split_file;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedState = Arc<Mutex<CoordinatorState>>;

/// Answer to an upload request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssignment {
    pub blocks: Vec<BlockPlacement>,
}

/// Stored layout of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    #[serde(flatten)]
    pub metadata: FileMetadata,
    pub blocks: Vec<BlockPlacement>,
}

pub struct CoordinatorState {
    liveness: LivenessTracker,
    files: IndexMap<String, FileMetadata>,
    assignments: IndexMap<String, Vec<String>>,
    last_updated: Option<DateTime<Utc>>,
    placement: PlacementManager,
    block_size: u64,
    max_blocks_per_file: u64,
    store: MetadataStore,
}

impl CoordinatorState {
    /// Build the state from whatever the store holds (or nothing).
    pub fn recover(config: &CoordinatorConfig, store: MetadataStore) -> Self {
        let snapshot = store.load().into_snapshot();
        Self::from_snapshot(config, store, snapshot)
    }

    pub fn from_snapshot(
        config: &CoordinatorConfig,
        store: MetadataStore,
        snapshot: MetadataSnapshot,
    ) -> Self {
        Self {
            liveness: LivenessTracker::with_last_seen(
                snapshot.active_datanodes,
                config.liveness_timeout(),
            ),
            files: snapshot.file_metadata,
            assignments: snapshot.block_assignments,
            last_updated: snapshot.last_updated,
            placement: PlacementManager::new(config.replication_factor),
            block_size: config.block_size,
            max_blocks_per_file: config.max_blocks_per_file,
            store,
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn record_heartbeat(&mut self, node_id: &str, at: DateTime<Utc>) -> HeartbeatOutcome {
        let was_available = self.liveness.is_available(node_id, at);
        let outcome = self.liveness.record_heartbeat(node_id, at);
        if outcome == HeartbeatOutcome::Recorded && !was_available {
            tracing::info!(node_id, "Datanode available again");
        }
        outcome
    }

    pub fn available_nodes(&self, now: DateTime<Utc>) -> Vec<String> {
        self.liveness.available_nodes(now)
    }

    pub fn node_states(&self, now: DateTime<Utc>) -> Vec<NodeStatus> {
        self.liveness.node_states(now)
    }

    /// Split, place and record a file, then persist the snapshot.
    ///
    /// A zero-byte file yields an empty assignment and writes nothing.
    /// A file needing more than `max_blocks_per_file` blocks fails with
    /// [`Error::FileTooLarge`] before anything is allocated.
    /// With no live datanodes this fails with [`Error::NoCapacity`] and
    /// writes nothing. A failed persist is logged but does not fail the
    /// call: memory runs ahead of disk until the next successful persist.
    pub fn assign(
        &mut self,
        filename: &str,
        file_size: u64,
        now: DateTime<Utc>,
    ) -> Result<FileAssignment> {
        let num_blocks = file_size.div_ceil(self.block_size);
        if num_blocks > self.max_blocks_per_file {
            tracing::warn!(filename, file_size, num_blocks, "Rejecting upload: too many blocks");
            return Err(Error::FileTooLarge {
                size: file_size,
                blocks: num_blocks,
                max: self.max_blocks_per_file,
            });
        }

        let blocks = split_file(filename, file_size, self.block_size);
        if blocks.is_empty() {
            return Ok(FileAssignment::default());
        }

        let available = self.liveness.available_nodes(now);
        let placed = match self.placement.place(&blocks, &available) {
            Ok(placed) => placed,
            Err(e) => {
                tracing::warn!(filename, file_size, "Rejecting upload: {}", e);
                return Err(e);
            }
        };

        if self.files.contains_key(filename) {
            tracing::info!(filename, "Overwriting metadata of existing file");
        }
        self.files.insert(
            filename.to_string(),
            FileMetadata {
                size: file_size,
                total_blocks: placed.len() as u64,
                created_at: now,
                replication_factor: self.placement.replication_factor(),
                block_size: self.block_size,
                block_ids: placed.iter().map(|p| p.block_id.clone()).collect(),
            },
        );
        for p in &placed {
            self.assignments
                .insert(p.block_id.clone(), p.assigned_datanodes.clone());
        }
        self.last_updated = Some(now);

        tracing::info!(
            filename,
            file_size,
            blocks = placed.len(),
            datanodes = available.len(),
            "Assigned blocks"
        );

        if let Err(e) = self.store.persist(&self.snapshot()) {
            tracing::error!(
                filename,
                path = %self.store.path().display(),
                "Failed to persist metadata snapshot: {}",
                e
            );
        }

        Ok(FileAssignment { blocks: placed })
    }

    /// Stored layout of `filename`, rebuilt from metadata and assignments.
    pub fn file_info(&self, filename: &str) -> Result<FileInfo> {
        let metadata = self
            .files
            .get(filename)
            .ok_or_else(|| Error::FileNotFound(filename.to_string()))?;

        let last = metadata.block_ids.len().saturating_sub(1);
        let blocks = metadata
            .block_ids
            .iter()
            .enumerate()
            .map(|(i, block_id)| BlockPlacement {
                block_id: block_id.clone(),
                // saturating: a hand-edited snapshot may disagree with itself
                size: if i == last {
                    metadata
                        .size
                        .saturating_sub(metadata.block_size.saturating_mul(last as u64))
                } else {
                    metadata.block_size
                },
                assigned_datanodes: self.assignments.get(block_id).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(FileInfo {
            filename: filename.to_string(),
            metadata: metadata.clone(),
            blocks,
        })
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn block_assignment(&self, block_id: &str) -> Option<&[String]> {
        self.assignments.get(block_id).map(Vec::as_slice)
    }

    pub fn snapshot(&self) -> MetadataSnapshot {
        MetadataSnapshot {
            active_datanodes: self.liveness.last_seen().clone(),
            file_metadata: self.files.clone(),
            block_assignments: self.assignments.clone(),
            last_updated: self.last_updated,
        }
    }
}

/// Lock the shared state. A handler that panicked mid-update leaves the
/// data as it was at the panic; serving it is preferable to refusing all
/// further requests.
pub fn lock(state: &SharedState) -> MutexGuard<'_, CoordinatorState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
