//! Datanode binary

use clap::{Parser, Subcommand};
use minidfs::{common::init_tracing, Config, DataNodeServer};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minidfs-datanode")]
#[command(about = "minidfs datanode: stores blocks and heartbeats to the coordinator")]
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
    /// Start datanode server
    Serve {
        /// Node ID announced in heartbeats
        #[arg(long, env = "NODE_ID")]
        id: Option<String>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Block directory
        #[arg(long)]
        data: Option<PathBuf>,

        /// Coordinator base URL
        #[arg(long)]
        coordinator: Option<String>,

        /// Heartbeat interval in milliseconds
        #[arg(long)]
        heartbeat_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Serve {
            id,
            bind,
            data,
            coordinator,
            heartbeat_ms,
        } => {
            let mut dn_config = config.datanode;
            if let Some(id) = id {
                dn_config.node_id = id;
            }
            if let Some(bind) = bind {
                dn_config.bind_addr = bind;
            }
            if let Some(data) = data {
                dn_config.data_dir = data;
            }
            if let Some(coordinator) = coordinator {
                dn_config.coordinator_url = coordinator;
            }
            if let Some(ms) = heartbeat_ms {
                dn_config.heartbeat_interval_ms = ms;
            }

            DataNodeServer::new(dn_config).serve().await?;
        }
    }

    Ok(())
}
