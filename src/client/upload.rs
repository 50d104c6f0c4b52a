//! Upload client
//!
//! Asks the coordinator for a block assignment, then pushes each block's
//! bytes to every assigned datanode. The coordinator is never told whether
//! a push succeeded.

use crate::common::{encode_path_segment, ClientConfig, Error, Result};
use crate::coordinator::state::{FileAssignment, FileInfo};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::{stream, StreamExt};
use reqwest::StatusCode;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Thin client for the coordinator API.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn health(&self) -> bool {
        match self.http.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::error!("Failed to connect to coordinator: {}", e);
                false
            }
        }
    }

    pub async fn request_assignment(&self, filename: &str, size: u64) -> Result<FileAssignment> {
        let resp = self
            .http
            .post(format!("{}/files", self.base_url))
            .json(&json!({ "filename": filename, "filesize_bytes": size }))
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::SERVICE_UNAVAILABLE => Err(Error::NoCapacity),
            s => Err(Error::Http(format!("coordinator answered {} for {}", s, filename))),
        }
    }

    pub async fn file_info(&self, filename: &str) -> Result<FileInfo> {
        let resp = self
            .http
            .get(format!("{}/files/{}", self.base_url, encode_path_segment(filename)))
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(Error::FileNotFound(filename.to_string())),
            s => Err(Error::Http(format!("coordinator answered {}", s))),
        }
    }
}

/// A file whose blocks all reached their datanodes.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub assignment: FileAssignment,
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub succeeded: Vec<UploadOutcome>,
    /// Files that still failed after the retry pass.
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Uploader {
    coordinator: CoordinatorClient,
    http: reqwest::Client,
    config: ClientConfig,
}

impl Uploader {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Ok(Self {
            coordinator: CoordinatorClient::new(&config.coordinator_url, timeout)?,
            http: reqwest::Client::builder().timeout(timeout).build()?,
            config,
        })
    }

    pub fn coordinator(&self) -> &CoordinatorClient {
        &self.coordinator
    }

    /// Upload one file: fetch its assignment, then push every replica.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadOutcome> {
        let size = tokio::fs::metadata(path).await?.len();
        let filename = path.to_string_lossy().into_owned();
        let assignment = self.coordinator.request_assignment(&filename, size).await?;

        if assignment.blocks.is_empty() {
            tracing::info!(file = %filename, "Nothing to upload");
            return Ok(UploadOutcome {
                path: path.to_path_buf(),
                assignment,
            });
        }

        let mut file = tokio::fs::File::open(path).await?;
        for block in &assignment.blocks {
            let mut data = vec![0u8; block.size as usize];
            file.read_exact(&mut data).await?;
            let encoded = STANDARD.encode(&data);

            for node_id in &block.assigned_datanodes {
                self.push_block(node_id, &block.block_id, &encoded).await?;
                tracing::info!(block_id = %block.block_id, node_id = %node_id, "Block sent");
            }
        }

        Ok(UploadOutcome {
            path: path.to_path_buf(),
            assignment,
        })
    }

    async fn push_block(&self, node_id: &str, block_id: &str, encoded: &str) -> Result<()> {
        let url = format!("{}/store_block", self.config.datanode_url(node_id));
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "block_id": block_id, "block_data": encoded }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("sending {} to {}: {}", block_id, node_id, e)))?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "{} rejected {}: {}",
                node_id,
                block_id,
                resp.status()
            )));
        }
        Ok(())
    }

    /// Upload files concurrently; failures get one retry pass after a delay.
    pub async fn upload_many(&self, paths: Vec<PathBuf>) -> UploadReport {
        let mut report = UploadReport::default();
        if paths.is_empty() {
            tracing::info!("No files to upload");
            return report;
        }
        tracing::info!(
            files = paths.len(),
            max_concurrent = self.config.max_concurrent,
            "Starting concurrent upload"
        );

        let failed = self.upload_pass(paths, &mut report).await;
        if failed.is_empty() {
            return report;
        }

        tracing::info!(
            files = failed.len(),
            delay_ms = self.config.retry_delay_ms,
            "Retrying failed files"
        );
        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;

        let retry: Vec<PathBuf> = failed.into_iter().map(|(p, _)| p).collect();
        let still_failed = self.upload_pass(retry, &mut report).await;
        for (path, reason) in &still_failed {
            tracing::error!(file = %path.display(), "Retry failed, giving up: {}", reason);
        }
        report.failed = still_failed;
        report
    }

    async fn upload_pass(
        &self,
        paths: Vec<PathBuf>,
        report: &mut UploadReport,
    ) -> Vec<(PathBuf, String)> {
        let results: Vec<(PathBuf, Result<UploadOutcome>)> = stream::iter(paths)
            .map(|path| async move {
                let result = self.upload_file(&path).await;
                (path, result)
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut failed = Vec::new();
        for (path, result) in results {
            match result {
                Ok(outcome) => {
                    tracing::info!(file = %path.display(), "Uploaded");
                    report.succeeded.push(outcome);
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), "Upload failed: {}", e);
                    failed.push((path, e.to_string()));
                }
            }
        }
        failed
    }
}

/// Files in `dir` (not recursive) whose extension is in `extensions`,
/// sorted by path.
pub fn scan_directory(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        tracing::info!(dir = %dir.display(), "No matching files");
    } else {
        tracing::info!(dir = %dir.display(), count = files.len(), "Found files to upload");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_directory_filters_extensions() {
        let dir = tempdir().unwrap();
        for name in ["b.txt", "a.PDF", "c.bin", "d"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let files = scan_directory(dir.path(), &["txt".into(), "pdf".into()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.txt"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(scan_directory(&dir.path().join("nope"), &["txt".into()]).is_err());
    }
}
