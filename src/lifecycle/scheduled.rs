//! Scheduled (timer) invocations.
//!
//! Each tick is its own invocation: a fresh accumulator with a scheduled
//! origin, one captured line, and a background flush.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::{IngestConfig, ScheduleConfig};
use crate::lifecycle::BackgroundTasks;
use crate::telemetry::accumulator::epoch_millis;
use crate::telemetry::{IngestClient, LogAccumulator, Origin};

pub struct Scheduler {
    schedule: ScheduleConfig,
    ingest_config: IngestConfig,
    ingest: IngestClient,
    background: BackgroundTasks,
}

impl Scheduler {
    pub fn new(
        schedule: ScheduleConfig,
        ingest_config: IngestConfig,
        ingest: IngestClient,
        background: BackgroundTasks,
    ) -> Self {
        Self {
            schedule,
            ingest_config,
            ingest,
            background,
        }
    }

    /// Fire an invocation every `interval_secs` until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.schedule.interval_secs));
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval_secs = self.schedule.interval_secs, "Scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.fire(epoch_millis()).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Scheduler stopped");
                    break;
                }
            }
        }
    }

    /// Run one scheduled invocation and hand its flush to the background
    /// registry. Returns the accumulator, or `None` without an ingestion key.
    pub async fn fire(&self, scheduled_time: u64) -> Option<LogAccumulator> {
        let Some(key) = self.ingest_config.api_key.clone() else {
            tracing::warn!("Scheduled trigger skipped: no ingestion key configured");
            return None;
        };

        let origin = Origin::Scheduled { scheduled_time };
        let accumulator = LogAccumulator::new(
            key,
            &self.ingest_config.app_name,
            Some(self.ingest_config.environment.as_str()),
            Some(self.ingest_config.source.as_str()),
            Some(&origin),
            None,
            None,
        );

        accumulator
            .capture(async {
                tracing::info!("Scheduled trigger fired at {}", scheduled_time);
            })
            .await;

        let flush = accumulator.clone();
        let ingest = self.ingest.clone();
        self.background.spawn(async move { flush.flush(&ingest).await });

        Some(accumulator)
    }
}
