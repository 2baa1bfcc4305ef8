//! Outbound fetch to the (possibly re-pointed) destination.
//!
//! # Responsibilities
//! - Send the forwarded request, streaming its body unless it was captured
//! - Hand the upstream response back as an axum response, streamed
//!
//! # Design Decisions
//! - Redirects are relayed to the caller, never followed
//! - `Host` and `Transfer-Encoding` are re-derived for the outbound request
//! - No explicit timeouts; transport defaults apply

use axum::body::{Body, HttpBody};
use axum::http::{header, Request, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Chunks buffered between the inbound body and the outbound request.
const BODY_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error("upstream request failed")]
    Transport(#[from] reqwest::Error),

    #[error("failed to build response")]
    Response(#[from] axum::http::Error),
}

/// Body of a forwarded request.
#[derive(Debug)]
pub enum ForwardBody {
    Empty,
    /// Already read into memory, e.g. to record it in the log meta.
    Buffered(Bytes),
    /// Passed through chunk by chunk.
    Streamed(Body),
}

impl ForwardBody {
    /// Wrap an inbound body for streaming. A body known to be empty is sent
    /// as no body at all.
    pub fn from_inbound(body: Body) -> Self {
        if body.size_hint().exact() == Some(0) {
            ForwardBody::Empty
        } else {
            ForwardBody::Streamed(body)
        }
    }

    fn into_reqwest(self) -> Option<reqwest::Body> {
        match self {
            ForwardBody::Empty => None,
            ForwardBody::Buffered(bytes) if bytes.is_empty() => None,
            ForwardBody::Buffered(bytes) => Some(reqwest::Body::from(bytes)),
            ForwardBody::Streamed(body) => Some(reqwest::Body::wrap_stream(pump(body))),
        }
    }
}

/// reqwest needs a `Sync` stream and the inbound body is not, so its chunks
/// are moved through a channel by a separate task.
fn pump(
    body: Body,
) -> impl futures_util::Stream<Item = Result<Bytes, axum::Error>> + Send + Sync + 'static {
    let (tx, mut rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut data = body.into_data_stream();
        while let Some(chunk) = data.next().await {
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });
    futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx))
}

/// HTTP client for forwarded requests.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { client })
    }

    /// Send `request` to its absolute URI.
    pub async fn send(
        &self,
        request: Request<ForwardBody>,
    ) -> Result<Response<Body>, UpstreamError> {
        let (mut parts, body) = request.into_parts();
        let url = Url::parse(&parts.uri.to_string())?;
        // Recomputed by the client for the destination
        parts.headers.remove(header::HOST);
        parts.headers.remove(header::TRANSFER_ENCODING);

        let mut outbound = self
            .client
            .request(parts.method, url)
            .headers(parts.headers);

        if let Some(body) = body.into_reqwest() {
            outbound = outbound.body(body);
        }

        let upstream = outbound.send().await?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(headers) = response.headers_mut() {
            headers.extend(upstream.headers().clone());
        }
        Ok(response.body(Body::from_stream(upstream.bytes_stream()))?)
    }
}
