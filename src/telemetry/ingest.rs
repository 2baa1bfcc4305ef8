//! Delivery of accumulated log lines to the ingestion endpoint.
//!
//! # Wire Format
//! ```text
//! POST <endpoint>?tags=<t1>&tags=<t2>&hostname=<label>&time=<epoch ms>
//! Accept: application/json
//! Content-Type: application/json
//! apikey: <delivery key>
//!
//! {"lines": [{line, timestamp, level, app, env, source, meta}, ...]}
//! ```
//! The body is omitted entirely when there are no lines.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::telemetry::entry::{LogBatch, LogLine};

/// Header carrying the delivery key.
pub const API_KEY_HEADER: &str = "apikey";

/// Errors from a delivery attempt.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request never produced a response.
    #[error("log delivery failed")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode log batch")]
    Encode(#[from] serde_json::Error),
}

/// HTTP client bound to one ingestion endpoint.
#[derive(Debug, Clone)]
pub struct IngestClient {
    client: Client,
    endpoint: Url,
}

impl IngestClient {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Build the delivery URL: one `tags` pair per tag in order, then
    /// `hostname` and `time`.
    pub fn delivery_url(&self, tags: &[String], hostname: &str, time_ms: u64) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for tag in tags {
                query.append_pair("tags", tag);
            }
            query.append_pair("hostname", hostname);
            query.append_pair("time", &time_ms.to_string());
        }
        url
    }

    /// Send one batch. Any HTTP status counts as delivered; only transport
    /// and encoding failures are errors.
    pub async fn deliver(
        &self,
        key: &str,
        tags: &[String],
        hostname: &str,
        time_ms: u64,
        lines: &[LogLine],
    ) -> Result<StatusCode, IngestError> {
        let url = self.delivery_url(tags, hostname, time_ms);

        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, key);

        if !lines.is_empty() {
            request = request.body(serde_json::to_vec(&LogBatch { lines })?);
        }

        let response = request.send().await?;
        Ok(response.status())
    }
}

/// Render an error and its source chain as `"<message>: <cause>: ..."`.
pub fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
