//! Common utilities and types shared across minidfs

pub mod config;
pub mod error;
pub mod tracing_middleware;
pub mod utils;

pub use config::{max_body_bytes_for_block, ClientConfig, Config, CoordinatorConfig, DataNodeConfig};
pub use error::{Error, Result};
pub use tracing_middleware::{init_tracing, request_tracing_middleware, REQUEST_ID_HEADER};
pub use utils::{encode_path_segment, format_bytes, shutdown_signal, NodeState};
