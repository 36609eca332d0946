//! authd - session-based authentication daemon

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use authd::{Config, Server};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Session-based authentication daemon
#[derive(Parser, Debug)]
#[command(name = "authd", version, about = "Session-based authentication daemon")]
struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to SQLite database file (default: in-memory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authd=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Config file and environment first, CLI flags on top
    let mut config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.db_path = Some(database.to_string_lossy().into_owned());
    }

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
