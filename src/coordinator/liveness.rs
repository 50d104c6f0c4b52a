//! Heartbeat-driven datanode liveness
//!
//! A node is available iff `now - last_heartbeat <= timeout`. Nodes are kept
//! in the order of their first-ever heartbeat; placement depends on that
//! order, so it must never be re-sorted. Silent nodes stay in the map and
//! simply stop being available.

use crate::common::NodeState;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// What a heartbeat did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// First heartbeat ever seen from this node.
    Registered,
    /// Last-seen time moved forward (or stayed equal).
    Recorded,
    /// Older than the recorded heartbeat; ignored.
    Stale,
}

/// Admin view of one tracked node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node_id: String,
    pub last_heartbeat: DateTime<Utc>,
    pub state: NodeState,
}

#[derive(Debug, Clone)]
pub struct LivenessTracker {
    last_seen: IndexMap<String, DateTime<Utc>>,
    timeout: Duration,
}

impl LivenessTracker {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self::with_last_seen(IndexMap::new(), timeout)
    }

    /// Rebuild a tracker from persisted heartbeats, keeping their order.
    pub fn with_last_seen(
        last_seen: IndexMap<String, DateTime<Utc>>,
        timeout: std::time::Duration,
    ) -> Self {
        let timeout = Duration::from_std(timeout).unwrap_or(Duration::MAX);
        Self { last_seen, timeout }
    }

    pub fn record_heartbeat(&mut self, node_id: &str, timestamp: DateTime<Utc>) -> HeartbeatOutcome {
        match self.last_seen.get_mut(node_id) {
            None => {
                self.last_seen.insert(node_id.to_string(), timestamp);
                tracing::info!(node_id, "Datanode registered");
                HeartbeatOutcome::Registered
            }
            Some(last) if timestamp < *last => {
                tracing::debug!(
                    node_id,
                    %timestamp,
                    last_seen = %last,
                    "Ignoring out-of-order heartbeat"
                );
                HeartbeatOutcome::Stale
            }
            Some(last) => {
                *last = timestamp;
                HeartbeatOutcome::Recorded
            }
        }
    }

    pub fn is_available(&self, node_id: &str, now: DateTime<Utc>) -> bool {
        self.last_seen
            .get(node_id)
            .is_some_and(|last| self.within_timeout(*last, now))
    }

    /// Available nodes in first-heartbeat order.
    pub fn available_nodes(&self, now: DateTime<Utc>) -> Vec<String> {
        self.last_seen
            .iter()
            .filter(|(_, last)| self.within_timeout(**last, now))
            .map(|(node_id, _)| node_id.clone())
            .collect()
    }

    pub fn node_states(&self, now: DateTime<Utc>) -> Vec<NodeStatus> {
        self.last_seen
            .iter()
            .map(|(node_id, last)| NodeStatus {
                node_id: node_id.clone(),
                last_heartbeat: *last,
                state: if self.within_timeout(*last, now) {
                    NodeState::Alive
                } else {
                    NodeState::Dead
                },
            })
            .collect()
    }

    pub fn last_seen(&self) -> &IndexMap<String, DateTime<Utc>> {
        &self.last_seen
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    // A heartbeat stamped slightly in the future (clock skew) counts as fresh.
    fn within_timeout(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last) <= self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn tracker() -> LivenessTracker {
        LivenessTracker::new(std::time::Duration::from_secs(30))
    }

    #[test]
    fn test_timeout_boundary() {
        let mut tracker = tracker();
        tracker.record_heartbeat("dn-1", t(0));

        assert!(tracker.is_available("dn-1", t(0)));
        assert!(tracker.is_available("dn-1", t(30)));
        assert!(!tracker.is_available("dn-1", t(31)));
        assert!(
            !tracker.is_available("dn-1", t(30) + Duration::milliseconds(1)),
            "one millisecond past the timeout is unavailable"
        );
        assert!(!tracker.is_available("dn-unknown", t(0)));
    }

    #[test]
    fn test_first_seen_order_is_kept() {
        let mut tracker = tracker();
        tracker.record_heartbeat("zeta", t(0));
        tracker.record_heartbeat("alpha", t(1));
        tracker.record_heartbeat("mid", t(2));
        // refreshing does not move a node to the back
        tracker.record_heartbeat("zeta", t(3));

        assert_eq!(tracker.available_nodes(t(4)), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_silent_nodes_age_out_but_stay_tracked() {
        let mut tracker = tracker();
        tracker.record_heartbeat("dn-1", t(0));
        tracker.record_heartbeat("dn-2", t(20));

        assert_eq!(tracker.available_nodes(t(40)), vec!["dn-2"]);
        assert_eq!(tracker.len(), 2);

        let states = tracker.node_states(t(40));
        assert_eq!(states[0].state, NodeState::Dead);
        assert_eq!(states[1].state, NodeState::Alive);

        // a fresh heartbeat brings the node back
        tracker.record_heartbeat("dn-1", t(41));
        assert_eq!(tracker.available_nodes(t(41)), vec!["dn-1", "dn-2"]);
    }

    #[test]
    fn test_stale_heartbeat_does_not_extend_liveness() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.record_heartbeat("dn-1", t(100)),
            HeartbeatOutcome::Registered
        );
        assert_eq!(
            tracker.record_heartbeat("dn-1", t(50)),
            HeartbeatOutcome::Stale
        );
        assert_eq!(tracker.last_seen()["dn-1"], t(100));
        assert_eq!(
            tracker.record_heartbeat("dn-1", t(100)),
            HeartbeatOutcome::Recorded
        );
    }
}
