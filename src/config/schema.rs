//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// How inbound requests are turned into outbound ones.
    pub upstream: UpstreamConfig,

    /// Log ingestion endpoint and default log fields.
    pub ingest: IngestConfig,

    /// Scheduled trigger settings.
    pub schedule: ScheduleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream request settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme used to rebuild absolute URLs from origin-form requests.
    pub default_scheme: String,

    /// Largest request body accepted for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_scheme: "https".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Log ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Full URL of the ingestion endpoint.
    pub endpoint: String,

    /// Delivery key. Usually supplied through `EDGE_RELAY_INGEST_KEY`.
    pub api_key: Option<String>,

    /// `app` field of lines before origin headers are applied.
    pub app_name: String,

    /// `env` field of lines before origin headers are applied.
    pub environment: String,

    /// `source` field of lines before origin headers are applied.
    pub source: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://logs.logdna.com/logs/ingest".to_string(),
            api_key: None,
            app_name: "edge-relay".to_string(),
            environment: "production".to_string(),
            source: "edge-relay".to_string(),
        }
    }
}

/// Scheduled trigger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fire scheduled invocations.
    pub enabled: bool,

    /// Interval between invocations in seconds.
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log output instead of the pretty format.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
