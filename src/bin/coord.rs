//! Coordinator binary

use clap::{Parser, Subcommand};
use minidfs::{common::init_tracing, Config, Coordinator};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minidfs-coord")]
#[command(about = "minidfs coordinator: block placement and metadata")]
#[command(version)]
struct Cli {
    /// Config file (TOML); MINIDFS_* env vars are applied on top
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Metadata snapshot file
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Block size in bytes
        #[arg(long)]
        block_size: Option<u64>,

        /// Replication factor
        #[arg(long)]
        replicas: Option<usize>,

        /// Seconds of heartbeat silence before a datanode is unavailable
        #[arg(long)]
        liveness_timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Serve {
            bind,
            snapshot,
            block_size,
            replicas,
            liveness_timeout,
        } => {
            // CLI has priority over file and env
            let mut coord_config = config.coordinator;
            if let Some(bind) = bind {
                coord_config.bind_addr = bind;
            }
            if let Some(snapshot) = snapshot {
                coord_config.snapshot_path = snapshot;
            }
            if let Some(block_size) = block_size {
                coord_config.block_size = block_size;
            }
            if let Some(replicas) = replicas {
                coord_config.replication_factor = replicas;
            }
            if let Some(secs) = liveness_timeout {
                coord_config.liveness_timeout_secs = secs;
            }
            coord_config.validate()?;

            Coordinator::new(coord_config).serve().await?;
        }
    }

    Ok(())
}
