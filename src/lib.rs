//! # minidfs
//!
//! A miniature distributed file store:
//! - A coordinator splits files into fixed-size blocks and places replicas
//!   on live datanodes (round-robin)
//! - Datanodes store block blobs and heartbeat once per second
//! - Coordinator metadata is persisted as an atomically replaced JSON snapshot
//!
//! ## Architecture
//!
//! ```text
//!            POST /files (name, size)
//!  client ──────────────────────────────► coordinator
//!    │     ◄── block → datanode assignment   ▲  ▲  ▲
//!    │                                       │  │  │ heartbeats (1s)
//!    │  POST /store_block          ┌─────────┘  │  └─────────┐
//!    └───────────────────────► datanode-1   datanode-2   datanode-3
//! ```
//!
//! ## Usage
//!
//! ### Start a coordinator
//! ```bash
//! minidfs-coord serve --bind 0.0.0.0:9870 --snapshot ./coord-data/metadata.json
//! ```
//!
//! ### Start a datanode
//! ```bash
//! minidfs-datanode serve --id datanode-1 --bind 0.0.0.0:8000 \
//!   --data ./dn1-data --coordinator http://localhost:9870
//! ```
//!
//! ### Upload
//! ```bash
//! minidfs upload ./client_testfiles
//! minidfs info client_testfiles/report.pdf
//! ```

pub mod client;
pub mod common;
pub mod coordinator;
pub mod datanode;

pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use datanode::DataNodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
