//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid http(s) URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("upstream.default_scheme must be http or https, got {0:?}")]
    InvalidScheme(String),

    #[error("schedule.interval_secs must be greater than zero")]
    ZeroInterval,
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let endpoint_ok = url::Url::parse(&config.ingest.endpoint)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !endpoint_ok {
        errors.push(ValidationError::InvalidUrl {
            field: "ingest.endpoint",
            value: config.ingest.endpoint.clone(),
        });
    }

    if !matches!(config.upstream.default_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::InvalidScheme(
            config.upstream.default_scheme.clone(),
        ));
    }

    if config.schedule.enabled && config.schedule.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
