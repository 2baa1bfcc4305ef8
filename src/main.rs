//! Edge relay (v1)
//!
//! Forwards inbound requests to an optionally re-pointed destination and
//! ships each invocation's logs to a log-ingestion endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http::server ──▶ http::request (Origin-* headers, 404 without org)
//!                         │
//!                         ▼
//!                   telemetry::LogAccumulator ◀── tracing events (capture layer)
//!                         │
//!                         ▼
//!                   http::forward ──▶ http::upstream ──────────────▶ Destination
//!                                                                         │
//!     Client Response ◀──────────────── summary line logged ◀────────────┘
//!                         │
//!                         ▼ (detached)
//!                   telemetry::ingest ──────────────────────────────▶ Ingestion endpoint
//! ```

use clap::Parser;
use std::path::PathBuf;

use edge_relay::config::{self, env::ProcessEnv};
use edge_relay::lifecycle::startup;
use edge_relay::observability::logging;

#[derive(Parser)]
#[command(name = "edge-relay")]
#[command(about = "Request-forwarding relay with background log shipping", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), &ProcessEnv)?;

    if cli.check {
        println!("Configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("edge-relay v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await
}
