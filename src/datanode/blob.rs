//! On-disk block store
//!
//! One file per block, named by block id. Writes land in a `.tmp` file that
//! is synced and renamed into place, so a block file is either absent or
//! complete.

use crate::common::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const MAX_BLOCK_ID_LEN: usize = 255;

pub struct BlockStore {
    base_path: PathBuf,
}

impl BlockStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Durably store `data` under `block_id`, replacing any previous copy.
    pub async fn put(&self, block_id: &str, data: &[u8]) -> Result<()> {
        validate_block_id(block_id)?;
        let block_path = self.block_path(block_id);
        let temp_path = block_path.with_extension("tmp");

        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &block_path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(block_id, size = data.len(), "Stored block");
        Ok(())
    }

    pub fn contains(&self, block_id: &str) -> bool {
        validate_block_id(block_id).is_ok() && self.block_path(block_id).is_file()
    }

    fn block_path(&self, block_id: &str) -> PathBuf {
        self.base_path.join(block_id)
    }
}

/// Block ids become file names; only `[A-Za-z0-9_-]` is accepted.
pub fn validate_block_id(block_id: &str) -> Result<()> {
    let ok = !block_id.is_empty()
        && block_id.len() <= MAX_BLOCK_ID_LEN
        && block_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidBlockId(block_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_writes_block_file() {
        let dir = tempdir().unwrap();
        let store = BlockStore::new(dir.path().join("blocks")).unwrap();

        store.put("block_a_txt_0000_deadbeef", b"hello").await.unwrap();
        assert!(store.contains("block_a_txt_0000_deadbeef"));
        let on_disk = std::fs::read(store.base_path().join("block_a_txt_0000_deadbeef")).unwrap();
        assert_eq!(on_disk, b"hello");
        assert!(!store
            .base_path()
            .join("block_a_txt_0000_deadbeef.tmp")
            .exists());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempdir().unwrap();
        let store = BlockStore::new(dir.path()).unwrap();
        store.put("b1", b"first").await.unwrap();
        store.put("b1", b"second").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("b1")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let store = BlockStore::new(dir.path()).unwrap();
        for bad in ["", "../escape", "a/b", "a.b", "with space"] {
            assert!(
                matches!(store.put(bad, b"x").await, Err(Error::InvalidBlockId(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(!store.contains("../escape"));
    }
}
