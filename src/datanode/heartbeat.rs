//! Periodic liveness announcements to the coordinator
//!
//! Fire-and-forget: a failed heartbeat is logged and the next tick tries
//! again. There is no acknowledgment beyond the HTTP status.

use crate::common::{encode_path_segment, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub node_id: String,
    /// RFC 3339, node clock
    pub timestamp: String,
}

pub struct HeartbeatSender {
    client: reqwest::Client,
    url: String,
    node_id: String,
    interval: Duration,
}

impl HeartbeatSender {
    pub fn new(coordinator_url: &str, node_id: String, interval: Duration) -> Result<Self> {
        let url = heartbeat_url(coordinator_url, &node_id);
        let client = reqwest::Client::builder()
            .timeout(interval.max(Duration::from_secs(1)))
            .build()?;
        Ok(Self {
            client,
            url,
            node_id,
            interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send_once(&self) -> Result<()> {
        let payload = HeartbeatPayload {
            node_id: self.node_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };
        let resp = self.client.post(&self.url).json(&payload).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "coordinator answered {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Spawn the heartbeat loop.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.send_once().await {
                    Ok(()) => tracing::debug!(node_id = %self.node_id, "Heartbeat sent"),
                    Err(e) => tracing::warn!(node_id = %self.node_id, "Heartbeat failed: {}", e),
                }
            }
        })
    }
}

pub fn heartbeat_url(coordinator_url: &str, node_id: &str) -> String {
    format!(
        "{}/nodes/{}/heartbeat",
        coordinator_url.trim_end_matches('/'),
        encode_path_segment(node_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_url() {
        assert_eq!(
            heartbeat_url("http://namenode:9870/", "dn-1"),
            "http://namenode:9870/nodes/dn-1/heartbeat"
        );
        assert_eq!(
            heartbeat_url("http://namenode:9870", "rack 1/dn-7"),
            "http://namenode:9870/nodes/rack%201%2Fdn-7/heartbeat"
        );
    }

    #[tokio::test]
    async fn test_send_to_unreachable_coordinator_fails() {
        // port 9 (discard) is not listening on test machines
        let sender =
            HeartbeatSender::new("http://127.0.0.1:9", "dn-1".into(), Duration::from_millis(200))
                .unwrap();
        assert!(sender.send_once().await.is_err());
    }
}
