//! Datanode (storage node)
//!
//! Stores block blobs pushed by clients and announces liveness to the
//! coordinator once per second. It keeps no metadata of its own.

pub mod blob;
pub mod heartbeat;
pub mod http;
pub mod server;

pub use server::DataNodeServer;
