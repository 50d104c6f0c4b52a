//! Datanode server

use crate::common::{shutdown_signal, DataNodeConfig, Result};
use crate::datanode::blob::BlockStore;
use crate::datanode::heartbeat::HeartbeatSender;
use crate::datanode::http::{create_router, DataNodeState};
use std::sync::Arc;

pub struct DataNodeServer {
    config: DataNodeConfig,
}

impl DataNodeServer {
    pub fn new(config: DataNodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting datanode: {}", self.config.node_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Data dir: {}", self.config.data_dir.display());
        tracing::info!("  Coordinator: {}", self.config.coordinator_url);

        let store = Arc::new(BlockStore::new(&self.config.data_dir)?);
        let router = create_router(
            DataNodeState {
                store,
                node_id: self.config.node_id.clone(),
            },
            self.config.max_body_bytes,
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        let heartbeats = HeartbeatSender::new(
            &self.config.coordinator_url,
            self.config.node_id.clone(),
            self.config.heartbeat_interval(),
        )?;
        tracing::info!("  Heartbeats: {} every {:?}", heartbeats.url(), self.config.heartbeat_interval());
        let heartbeat_handle = heartbeats.start();

        tracing::info!("✓ Datanode ready");

        let res = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        heartbeat_handle.abort();
        res?;

        tracing::info!("Datanode stopped");
        Ok(())
    }
}
