//! Configuration for minidfs components
//!
//! Settings are read from an optional TOML file and then from environment
//! variables prefixed with `MINIDFS_` (nested keys separated by `__`, e.g.
//! `MINIDFS_COORDINATOR__REPLICATION_FACTOR=3`). Command-line flags in the
//! binaries override both.
//!
//! ```toml
//! log_level = "info"
//!
//! [coordinator]
//! bind_addr = "0.0.0.0:9870"
//! snapshot_path = "./coord-data/metadata.json"
//! block_size = 33554432
//! replication_factor = 2
//! liveness_timeout_secs = 30
//!
//! [datanode]
//! node_id = "datanode-1"
//! coordinator_url = "http://localhost:9870"
//! ```

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 32 MiB
pub const DEFAULT_BLOCK_SIZE: u64 = 33_554_432;
pub const DEFAULT_REPLICATION_FACTOR: usize = 2;
pub const DEFAULT_LIVENESS_TIMEOUT_SECS: u64 = 30;
/// 2 TiB at the default block size
pub const DEFAULT_MAX_BLOCKS_PER_FILE: u64 = 65_536;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub datanode: DataNodeConfig,

    #[serde(default)]
    pub client: ClientConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from an optional file plus `MINIDFS_*` env vars.
    ///
    /// A missing file is only an error when a path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("minidfs").required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("MINIDFS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.coordinator.validate()?;
        Ok(config)
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_coordinator_bind")]
    pub bind_addr: SocketAddr,

    /// Canonical location of the metadata snapshot
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Block size in bytes
    #[serde(default = "default_block_size")]
    pub block_size: u64,

    /// Replicas per block
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Silence after which a datanode is no longer eligible for placement
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    /// Upload requests that would split into more blocks are refused
    #[serde(default = "default_max_blocks_per_file")]
    pub max_blocks_per_file: u64,
}

fn default_coordinator_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9870))
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./coord-data/metadata.json")
}
fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}
fn default_replication_factor() -> usize {
    DEFAULT_REPLICATION_FACTOR
}
fn default_liveness_timeout() -> u64 {
    DEFAULT_LIVENESS_TIMEOUT_SECS
}
fn default_max_blocks_per_file() -> u64 {
    DEFAULT_MAX_BLOCKS_PER_FILE
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coordinator_bind(),
            snapshot_path: default_snapshot_path(),
            block_size: default_block_size(),
            replication_factor: default_replication_factor(),
            liveness_timeout_secs: default_liveness_timeout(),
            max_blocks_per_file: default_max_blocks_per_file(),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be positive".into()));
        }
        if self.replication_factor == 0 {
            return Err(Error::InvalidConfig(
                "replication_factor must be positive".into(),
            ));
        }
        if self.liveness_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "liveness_timeout_secs must be positive".into(),
            ));
        }
        if self.max_blocks_per_file == 0 {
            return Err(Error::InvalidConfig(
                "max_blocks_per_file must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }
}

/// Datanode (storage node) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNodeConfig {
    /// Identifier announced in heartbeats
    #[serde(default = "default_node_id")]
    pub node_id: String,

    #[serde(default = "default_datanode_bind")]
    pub bind_addr: SocketAddr,

    /// Directory holding one file per stored block
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Max accepted request body (base64 of one block plus envelope).
    ///
    /// The datanode does not know the coordinator's block size. The default
    /// fits [`DEFAULT_BLOCK_SIZE`]; a coordinator configured with larger
    /// blocks needs datanodes set to at least
    /// [`max_body_bytes_for_block`] of that size, or pushes fail with 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_node_id() -> String {
    "datanode".to_string()
}
fn default_datanode_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./datanode-data")
}
fn default_coordinator_url() -> String {
    "http://localhost:9870".to_string()
}
fn default_heartbeat_interval() -> u64 {
    1_000
}
fn default_max_body_bytes() -> usize {
    max_body_bytes_for_block(DEFAULT_BLOCK_SIZE)
}

/// Request body needed to push one block of `block_size` bytes.
pub fn max_body_bytes_for_block(block_size: u64) -> usize {
    // base64 inflates by 4/3, plus the JSON envelope
    (block_size as usize / 3 + 1) * 4 + 64 * 1024
}

impl Default for DataNodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bind_addr: default_datanode_bind(),
            data_dir: default_data_dir(),
            coordinator_url: default_coordinator_url(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl DataNodeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Upload client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    /// How a node id becomes a base URL; `{node_id}` is substituted
    #[serde(default = "default_datanode_url_template")]
    pub datanode_url_template: String,

    /// Files uploaded at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Pause before the single retry pass over failed files
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Per-request timeout for block pushes
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// File extensions picked up by a directory scan
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_datanode_url_template() -> String {
    "http://{node_id}:8000".to_string()
}
fn default_max_concurrent() -> usize {
    5
}
fn default_retry_delay() -> u64 {
    2_000
}
fn default_request_timeout() -> u64 {
    10
}
fn default_extensions() -> Vec<String> {
    vec!["txt".to_string(), "pdf".to_string()]
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_url: default_coordinator_url(),
            datanode_url_template: default_datanode_url_template(),
            max_concurrent: default_max_concurrent(),
            retry_delay_ms: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
            extensions: default_extensions(),
        }
    }
}

impl ClientConfig {
    pub fn datanode_url(&self, node_id: &str) -> String {
        self.datanode_url_template.replace("{node_id}", node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.block_size, 33_554_432);
        assert_eq!(cfg.replication_factor, 2);
        assert_eq!(cfg.liveness_timeout(), Duration::from_secs(30));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_body_limit_fits_default_block() {
        let encoded = DEFAULT_BLOCK_SIZE.div_ceil(3) * 4;
        assert!(DataNodeConfig::default().max_body_bytes as u64 > encoded);
        assert!(max_body_bytes_for_block(4 * DEFAULT_BLOCK_SIZE) > DataNodeConfig::default().max_body_bytes);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let cfg = CoordinatorConfig {
            block_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let cfg = CoordinatorConfig {
            replication_factor: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = CoordinatorConfig {
            max_blocks_per_file: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minidfs.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[coordinator]\nblock_size = 1024\nreplication_factor = 3\n\n[client]\nmax_concurrent = 8"
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.coordinator.block_size, 1024);
        assert_eq!(cfg.coordinator.replication_factor, 3);
        assert_eq!(cfg.coordinator.liveness_timeout_secs, 30);
        assert_eq!(cfg.client.max_concurrent, 8);
        assert_eq!(cfg.datanode.node_id, "datanode");
    }

    #[test]
    fn test_datanode_url_template() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.datanode_url("dn-2"), "http://dn-2:8000");
    }
}
