//! Ordered startup of the relay process.

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, BackgroundTasks, Scheduler, Shutdown};
use crate::observability::metrics;
use crate::telemetry::IngestClient;

/// Start every subsystem and serve until a shutdown signal arrives.
///
/// Logging must already be initialized.
pub async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        ingest_endpoint = %config.ingest.endpoint,
        ingest_key_present = config.ingest.api_key.is_some(),
        schedule_enabled = config.schedule.enabled,
        "Configuration loaded"
    );
    if config.ingest.api_key.is_none() {
        tracing::warn!("No ingestion key configured; requests will be refused");
    }

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let ingest = IngestClient::new(reqwest::Client::new(), config.ingest.endpoint.parse()?);
    let background = BackgroundTasks::new();
    let shutdown = Shutdown::new();

    let scheduler = config.schedule.enabled.then(|| {
        Scheduler::new(
            config.schedule.clone(),
            config.ingest.clone(),
            ingest.clone(),
            background.clone(),
        )
    });
    if let Some(scheduler) = scheduler {
        let rx = shutdown.subscribe();
        tokio::spawn(scheduler.run(rx));
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::with_parts(config, ingest, background)?;
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
