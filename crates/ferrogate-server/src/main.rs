// ============================================
// File: crates/ferrogate-server/src/main.rs
// ============================================
//! # FerroGate Server Entry Point
//!
//! Loads a TOML group file, wires configured handler names to
//! implementations, and serves until interrupted.
//!
//! ## Usage
//! ```bash
//! ferrogate-server --config /etc/ferrogate/server.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ferrogate_core::ApiHandler;
use ferrogate_server::handlers::EchoHandler;
use ferrogate_server::{listen_and_serve_groups, ServeFileConfig};

/// FerroGate network service host.
#[derive(Parser, Debug)]
#[command(name = "ferrogate-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ferrogate.toml")]
    config: PathBuf,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

fn resolve_handler(name: &str) -> Option<Arc<dyn ApiHandler>> {
    match name {
        "echo" => Some(Arc::new(EchoHandler::new())),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging("info");

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ferrogate_server::Result<()> {
    let config = ServeFileConfig::load(&cli.config).await?;
    init_logging(&config.logging.level);

    info!(
        groups = config.groups.len(),
        "starting ferrogate-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let groups = listen_and_serve_groups(config.groups, &resolve_handler).await?;
    info!("all listener groups started");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| ferrogate_server::ServerError::startup_failed(e.to_string()))?;
    info!("shutdown signal received");

    for group in &groups {
        group.stop();
    }
    for group in &groups {
        group.join().await;
    }
    info!("server shutdown complete");
    Ok(())
}
