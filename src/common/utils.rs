//! Utility functions for minidfs

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Everything but `[A-Za-z0-9._-]` is escaped, including `/`
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-');

/// Encode a file name or node id as a single URL path segment
pub fn encode_path_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT_ENCODE_SET).to_string()
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

/// Datanode availability as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Alive,
    Dead,
}

/// Resolves on Ctrl-C; used for graceful shutdown of the HTTP servers.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(33_554_432), "32.00 MB");
        assert_eq!(format_bytes(73_400_320), "70.00 MB");
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("dir/a b.txt"), "dir%2Fa%20b.txt");
        assert_eq!(encode_path_segment("plain-name_1.pdf"), "plain-name_1.pdf");
    }

    #[test]
    fn test_node_state_serde() {
        assert_eq!(serde_json::to_string(&NodeState::Alive).unwrap(), "\"alive\"");
        assert_eq!(serde_json::to_string(&NodeState::Dead).unwrap(), "\"dead\"");
    }
}
