//! Coordinator server

use crate::common::{shutdown_signal, CoordinatorConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::metadata::MetadataStore;
use crate::coordinator::state::{CoordinatorState, SharedState};

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Load the snapshot and build the shared state.
    pub fn open_state(&self) -> Result<SharedState> {
        self.config.validate()?;
        let store = MetadataStore::open(&self.config.snapshot_path)?;
        Ok(CoordinatorState::recover(&self.config, store).into_shared())
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Snapshot: {}", self.config.snapshot_path.display());
        tracing::info!("  Block size: {} bytes", self.config.block_size);
        tracing::info!("  Replication factor: {}", self.config.replication_factor);
        tracing::info!("  Liveness timeout: {}s", self.config.liveness_timeout_secs);

        let state = self.open_state()?;
        let router = create_router(CoordState { state });

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Coordinator ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Coordinator stopped");
        Ok(())
    }
}
