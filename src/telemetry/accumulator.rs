//! The per-invocation log accumulator.
//!
//! # Responsibilities
//! - Hold the default fields, extra meta, tags and lines of one invocation
//! - Append lines from explicit calls and from ambient capture
//! - Seal and ship everything in a single delivery at the end
//!
//! # Design Decisions
//! - Cheap clonable handle over shared state so the capture layer can
//!   reach the same accumulator the handler holds
//! - Extra meta is merged into a line when it is appended; a later
//!   `set_meta` does not reach earlier lines
//! - Execution time is stamped onto every line at flush, one shared value
//! - A flush happens at most once; later attempts through other handles
//!   are ignored

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::observability::metrics;
use crate::telemetry::capture;
use crate::telemetry::entry::{LogData, LogLine, Severity};
use crate::telemetry::ingest::{describe_error, IngestClient};
use crate::telemetry::origin::{Origin, UNKNOWN_HOST_LABEL};
use crate::telemetry::tags::parse_tags;

/// Extra-meta key holding the captured request body.
pub const REQUEST_BODY_META: &str = "requestBody";

/// Extra-meta key holding the captured response body.
pub const RESPONSE_BODY_META: &str = "responseBody";

/// Meta key stamped onto every line at flush.
pub const EXECUTION_TIME_META: &str = "executionTime";

pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_SOURCE: &str = "edge-relay";

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

struct State {
    delivery_key: String,
    host_label: String,
    tags: Vec<String>,
    started: Instant,
    defaults: LogData,
    extra_meta: Map<String, Value>,
    entries: Vec<LogLine>,
    flushed: bool,
}

/// Everything a delivery needs, taken out of the accumulator at flush.
#[derive(Debug)]
pub(crate) struct SealedBatch {
    pub delivery_key: String,
    pub host_label: String,
    pub tags: Vec<String>,
    pub lines: Vec<LogLine>,
    pub execution_time_ms: u64,
}

/// Collects the log lines of one invocation.
#[derive(Clone)]
pub struct LogAccumulator {
    inner: Arc<Mutex<State>>,
}

impl std::fmt::Debug for LogAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("LogAccumulator")
            .field("host_label", &state.host_label)
            .field("tags", &state.tags)
            .field("entries", &state.entries.len())
            .field("flushed", &state.flushed)
            .finish()
    }
}

impl LogAccumulator {
    /// Create the accumulator for a new invocation.
    ///
    /// `body` is recorded under [`REQUEST_BODY_META`] right away so every
    /// line carries it. `tags_header` is split with [`parse_tags`].
    ///
    /// Ambient capture starts once the invocation's work runs inside
    /// [`LogAccumulator::capture`].
    pub fn new(
        delivery_key: impl Into<String>,
        app: &str,
        environment: Option<&str>,
        source: Option<&str>,
        origin: Option<&Origin>,
        body: Option<&str>,
        tags_header: Option<&str>,
    ) -> Self {
        let mut extra_meta = Map::new();
        if let Some(body) = body {
            extra_meta.insert(REQUEST_BODY_META.to_string(), Value::from(body));
        }

        let state = State {
            delivery_key: delivery_key.into(),
            host_label: host_label(origin),
            tags: tags_header.map(parse_tags).unwrap_or_default(),
            started: Instant::now(),
            defaults: build_defaults(app, environment, source, origin, None),
            extra_meta,
            entries: Vec::new(),
            flushed: false,
        };

        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `fut` with this accumulator as the capture target of its task.
    pub async fn capture<F: Future>(&self, fut: F) -> F::Output {
        capture::scope(self.clone(), fut).await
    }

    /// Recompute the default-field template and the host label.
    ///
    /// The template is returned, not installed; assign it back with
    /// [`LogAccumulator::set_defaults`].
    pub fn rebuild_defaults(
        &self,
        app: &str,
        environment: Option<&str>,
        source: Option<&str>,
        origin: Option<&Origin>,
        body: Option<&str>,
    ) -> LogData {
        let data = build_defaults(app, environment, source, origin, body);
        self.state().host_label = host_label(origin);
        data
    }

    pub fn set_defaults(&self, data: LogData) {
        self.state().defaults = data;
    }

    /// Append a line at `severity`.
    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let mut state = self.state();
        let mut meta = state.defaults.meta.clone();
        meta.extend(state.extra_meta.clone());

        let line = LogLine {
            line: message.into(),
            timestamp: epoch_millis(),
            level: severity,
            app: state.defaults.app.clone(),
            env: state.defaults.env.clone(),
            source: state.defaults.source.clone(),
            fields: state.defaults.fields.clone(),
            meta,
        };
        state.entries.push(line);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn debug_log(&self, message: impl Into<String>) {
        self.push(Severity::Debug, message);
    }

    pub fn error_log(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Set a top-level field on lines appended from now on. `None` is a no-op.
    pub fn set_field<V: Into<Value>>(&self, name: &str, value: Option<V>) {
        if let Some(value) = value {
            self.state().defaults.set(name, value.into());
        }
    }

    /// Set a key in the extra meta. `None` is a no-op.
    pub fn set_meta<V: Into<Value>>(&self, name: &str, value: Option<V>) {
        if let Some(value) = value {
            self.state()
                .extra_meta
                .insert(name.to_string(), value.into());
        }
    }

    /// Append a tag. `None` is a no-op.
    pub fn set_tag<T: Into<String>>(&self, value: Option<T>) {
        if let Some(value) = value {
            self.state().tags.push(value.into());
        }
    }

    pub fn entries(&self) -> Vec<LogLine> {
        self.state().entries.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state().tags.clone()
    }

    pub fn host_label(&self) -> String {
        self.state().host_label.clone()
    }

    pub fn defaults(&self) -> LogData {
        self.state().defaults.clone()
    }

    pub fn is_flushed(&self) -> bool {
        self.state().flushed
    }

    /// Stamp execution time onto every line and take the batch out.
    /// Returns `None` if this accumulator was already flushed.
    pub(crate) fn seal(&self) -> Option<SealedBatch> {
        let mut state = self.state();
        if state.flushed {
            return None;
        }
        state.flushed = true;

        let execution_time_ms = state.started.elapsed().as_millis() as u64;
        for line in &mut state.entries {
            line.meta
                .insert(EXECUTION_TIME_META.to_string(), Value::from(execution_time_ms));
        }

        Some(SealedBatch {
            delivery_key: state.delivery_key.clone(),
            host_label: state.host_label.clone(),
            tags: state.tags.clone(),
            lines: std::mem::take(&mut state.entries),
            execution_time_ms,
        })
    }

    /// Deliver all accumulated lines in one request. Never fails: delivery
    /// errors are logged and dropped.
    pub async fn flush(self, ingest: &IngestClient) {
        let Some(batch) = self.seal() else {
            tracing::warn!("Log accumulator already flushed, skipping");
            return;
        };

        let line_count = batch.lines.len();
        let result = ingest
            .deliver(
                &batch.delivery_key,
                &batch.tags,
                &batch.host_label,
                epoch_millis(),
                &batch.lines,
            )
            .await;

        match result {
            Ok(status) => {
                if !status.is_success() {
                    tracing::warn!(status = %status, lines = line_count, "Ingestion endpoint rejected log batch");
                } else {
                    tracing::debug!(status = %status, lines = line_count, "Log batch delivered");
                }
                metrics::record_flush("delivered", line_count);
            }
            Err(e) => {
                tracing::error!("{}", describe_error(&e));
                metrics::record_flush("failed", line_count);
            }
        }
    }
}

fn host_label(origin: Option<&Origin>) -> String {
    origin
        .map(Origin::host_label)
        .unwrap_or_else(|| UNKNOWN_HOST_LABEL.to_string())
}

fn build_defaults(
    app: &str,
    environment: Option<&str>,
    source: Option<&str>,
    origin: Option<&Origin>,
    body: Option<&str>,
) -> LogData {
    let mut meta = origin.map(Origin::meta).unwrap_or_default();
    if let Some(body) = body {
        meta.insert(REQUEST_BODY_META.to_string(), Value::from(body));
    }

    LogData {
        app: app.to_string(),
        env: environment.unwrap_or(DEFAULT_ENVIRONMENT).to_string(),
        source: source.unwrap_or(DEFAULT_SOURCE).to_string(),
        fields: Map::new(),
        meta,
    }
}
