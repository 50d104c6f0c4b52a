//! Coordinator: metadata and placement engine
//!
//! The coordinator is responsible for:
//! - Splitting files into fixed-size blocks
//! - Tracking datanode liveness from heartbeats
//! - Placing block replicas on live datanodes (round-robin)
//! - Persisting all of the above as an atomic JSON snapshot

pub mod http;
pub mod liveness;
pub mod metadata;
pub mod placement;
pub mod server;
pub mod splitter;
pub mod state;

pub use server::Coordinator;
pub use state::{CoordinatorState, FileAssignment, SharedState};
