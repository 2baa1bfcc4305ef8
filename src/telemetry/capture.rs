//! Ambient capture of `tracing` events into the current invocation's
//! accumulator.
//!
//! # Responsibilities
//! - Keep the active accumulator in task-local storage for one invocation
//! - Turn every event emitted inside that invocation into a log line
//!
//! # Design Decisions
//! - The accumulator is scoped to the invocation's task, so concurrent
//!   invocations never see each other's lines
//! - The layer only observes; formatting and output of the other layers in
//!   the subscriber are untouched
//! - Events outside an invocation are ignored by this layer
//! - Tasks spawned from inside an invocation do not inherit the scope

use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::telemetry::accumulator::LogAccumulator;
use crate::telemetry::entry::Severity;

tokio::task_local! {
    static CURRENT: LogAccumulator;
}

/// Run `fut` with `accumulator` as the capture target.
pub async fn scope<F: Future>(accumulator: LogAccumulator, fut: F) -> F::Output {
    CURRENT.scope(accumulator, fut).await
}

/// Subscriber layer appending events to the scoped accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureLayer;

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _ = CURRENT.try_with(|accumulator| {
            let mut visitor = EventVisitor::default();
            event.record(&mut visitor);
            accumulator.push(
                Severity::from(event.metadata().level()),
                visitor.into_line(),
            );
        });
    }
}

/// Collects the message and structured fields of one event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl EventVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    /// A lone message is used as-is. With structured fields the event is
    /// rendered as a JSON array `[message, {fields}]`.
    fn into_line(self) -> String {
        if self.fields.is_empty() {
            return self.message.unwrap_or_default();
        }
        let mut parts = Vec::with_capacity(2);
        if let Some(message) = self.message {
            parts.push(Value::String(message));
        }
        parts.push(Value::Object(self.fields));
        Value::Array(parts).to_string()
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }
}
