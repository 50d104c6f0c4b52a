//! CLI for uploading files and inspecting coordinator metadata

use clap::{Parser, Subcommand};
use minidfs::client::{render_assignment, scan_directory, Uploader};
use minidfs::{common::init_tracing, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minidfs")]
#[command(about = "minidfs upload client")]
#[command(version)]
struct Cli {
    /// Config file (TOML); MINIDFS_* env vars are applied on top
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Coordinator URL
    #[arg(long, global = true)]
    coordinator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, or every matching file of a directory
    Upload {
        /// File or directory
        #[arg(default_value = "client_testfiles")]
        path: PathBuf,

        /// Files uploaded at once
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Check that the coordinator is reachable
    Health,

    /// Show the stored block layout of a file
    Info {
        /// File name as it was uploaded
        filename: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    let mut client_config = config.client;
    if let Some(url) = cli.coordinator {
        client_config.coordinator_url = url;
    }

    match cli.command {
        Commands::Upload {
            path,
            max_concurrent,
        } => {
            if let Some(n) = max_concurrent {
                client_config.max_concurrent = n;
            }
            let files = if path.is_dir() {
                scan_directory(&path, &client_config.extensions)?
            } else {
                vec![path]
            };

            let uploader = Uploader::new(client_config)?;
            if !uploader.coordinator().health().await {
                anyhow::bail!("coordinator is not reachable");
            }

            let report = uploader.upload_many(files).await;
            for outcome in &report.succeeded {
                println!(
                    "{}",
                    render_assignment(&outcome.path.display().to_string(), &outcome.assignment)
                );
            }
            println!(
                "Uploaded: {}  Failed: {}",
                report.succeeded.len(),
                report.failed.len()
            );
            for (path, reason) in &report.failed {
                println!("  {}: {}", path.display(), reason);
            }
            if !report.failed.is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Health => {
            let uploader = Uploader::new(client_config)?;
            if uploader.coordinator().health().await {
                println!("Coordinator is healthy");
            } else {
                anyhow::bail!("coordinator is not reachable");
            }
        }

        Commands::Info { filename } => {
            let uploader = Uploader::new(client_config)?;
            let info = uploader.coordinator().file_info(&filename).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
