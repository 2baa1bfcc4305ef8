//! Log line and default-field types as they appear on the wire.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity attached to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template merged into every log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    pub app: String,
    pub env: String,
    pub source: String,

    /// Ad-hoc top-level fields added through `set_field`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Network/client attributes of the originating request, or the
    /// scheduled timestamp for timer invocations.
    pub meta: Map<String, Value>,
}

impl LogData {
    /// Assign a top-level field. `app`, `env` and `source` replace the typed
    /// fields; anything else lands in `fields`.
    pub fn set(&mut self, name: &str, value: Value) {
        let slot = match name {
            "app" => &mut self.app,
            "env" => &mut self.env,
            "source" => &mut self.source,
            "meta" => {
                if let Value::Object(meta) = value {
                    self.meta = meta;
                }
                return;
            }
            _ => {
                self.fields.insert(name.to_string(), value);
                return;
            }
        };
        *slot = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
    }
}

/// One structured log line queued for delivery.
///
/// Serialized flat. An entry in `fields` named `line`, `timestamp` or
/// `level` replaces the built-in value, so every key appears once.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub line: String,
    /// Epoch milliseconds at append time.
    pub timestamp: u64,
    pub level: Severity,
    pub app: String,
    pub env: String,
    pub source: String,
    pub fields: Map<String, Value>,
    pub meta: Map<String, Value>,
}

impl Serialize for LogLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.fields.contains_key("line") {
            map.serialize_entry("line", &self.line)?;
        }
        if !self.fields.contains_key("timestamp") {
            map.serialize_entry("timestamp", &self.timestamp)?;
        }
        if !self.fields.contains_key("level") {
            map.serialize_entry("level", &self.level)?;
        }
        map.serialize_entry("app", &self.app)?;
        map.serialize_entry("env", &self.env)?;
        map.serialize_entry("source", &self.source)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("meta", &self.meta)?;
        map.end()
    }
}

/// Body of the ingestion POST.
#[derive(Debug, Serialize)]
pub struct LogBatch<'a> {
    pub lines: &'a [LogLine],
}
