//! brickd daemon binary

use brickd::{Config, ControlPlane};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "brickd")]
#[command(about = "storage cluster control-plane daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control-plane daemon
    Serve {
        /// Display name for this node
        #[arg(long)]
        name: Option<String>,

        /// Bind address for the HTTP control API
        #[arg(long)]
        bind: Option<String>,

        /// Address other peers should use to reach this node
        #[arg(long)]
        advertise: Option<String>,

        /// Cluster-state database directory (in-memory when omitted)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            name,
            bind,
            advertise,
            db,
            config,
        } => {
            // File and environment first, CLI flags win
            let mut config = Config::load(config.as_deref())?;
            if let Some(name) = name {
                config.node_name = Some(name);
            }
            if let Some(bind) = bind {
                config.bind_addr = bind.parse()?;
            }
            if let Some(advertise) = advertise {
                config.advertise_addr = Some(advertise);
            }
            if let Some(db) = db {
                config.db_path = Some(db);
            }

            ControlPlane::new(config).serve().await?;
        }
    }

    Ok(())
}
