//! Inbound request inspection.
//!
//! # Responsibilities
//! - Parse the trigger headers that steer one invocation
//! - Rebuild the absolute URL of an origin-form request
//!
//! # Design Decisions
//! - `Origin-Org` is the only required header; everything else defaults
//! - Empty header values count as absent

use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use thiserror::Error;
use url::Url;

pub const REDIRECT_HOST: &str = "redirect-host";
pub const REDIRECT_PORT: &str = "redirect-port";
pub const ORIGIN_ORG: &str = "origin-org";
pub const ORIGIN_NAME: &str = "origin-name";
pub const ORIGIN_SOURCE: &str = "origin-source";
pub const ORIGIN_TAGS: &str = "origin-tags";
pub const DEBUG_CONTENT: &str = "debug-content";

pub const DEFAULT_ORIGIN_NAME: &str = "action.logger";
pub const DEFAULT_ORIGIN_SOURCE: &str = "Genesys";
pub const DEFAULT_ORIGIN_TAGS: &str = "Unknown";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing Origin-Org header")]
    MissingOrg,

    #[error("Cannot determine request URL: {0}")]
    Url(String),
}

/// Trigger headers of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginHeaders {
    pub redirect_host: Option<String>,
    pub redirect_port: Option<String>,
    pub org: String,
    pub name: String,
    pub source: String,
    pub tags: String,
    pub debug_content: bool,
}

impl OriginHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RequestError> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let org = get(ORIGIN_ORG).ok_or(RequestError::MissingOrg)?;

        Ok(Self {
            redirect_host: get(REDIRECT_HOST),
            redirect_port: get(REDIRECT_PORT),
            org,
            name: get(ORIGIN_NAME).unwrap_or_else(|| DEFAULT_ORIGIN_NAME.to_string()),
            source: get(ORIGIN_SOURCE).unwrap_or_else(|| DEFAULT_ORIGIN_SOURCE.to_string()),
            tags: get(ORIGIN_TAGS).unwrap_or_else(|| DEFAULT_ORIGIN_TAGS.to_string()),
            debug_content: get(DEBUG_CONTENT).as_deref() == Some("true"),
        })
    }
}

/// Absolute URL of the request. Origin-form URIs are completed from the
/// `Host` header and `default_scheme`.
pub fn absolute_url(parts: &Parts, default_scheme: &str) -> Result<Url, RequestError> {
    let uri = &parts.uri;
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).map_err(|e| RequestError::Url(e.to_string()));
    }

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RequestError::Url("no Host header".to_string()))?;
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    Url::parse(&format!("{default_scheme}://{host}{path}"))
        .map_err(|e| RequestError::Url(e.to_string()))
}
