use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use berth_core::api::server::{RestApiConfig, RestApiServer};

mod config;

use config::ServerConfig;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Capacity-aware VM placement and hardware reservation service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve {
        /// Bind address for the REST API server (e.g. 127.0.0.1:7410)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { bind, config } => {
            let file_config = match &config {
                Some(path) => {
                    let loaded = ServerConfig::load(path)?;
                    tracing::info!("loaded configuration from {}", path.display());
                    loaded
                }
                None => ServerConfig::default(),
            };

            let mut api_config = RestApiConfig {
                limits: file_config.limits,
                ..RestApiConfig::default()
            };
            if let Some(addr) = file_config.bind_address {
                api_config.bind_address = addr;
            }
            if let Some(addr) = bind {
                api_config.bind_address = addr;
            }

            RestApiServer::new(api_config)
                .serve()
                .await
                .context("REST API server failed")?;
        }
    }
    Ok(())
}
