//! HTTP server setup and the relay handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all relay handler
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Run one invocation per request: reject, forward, log, flush
//! - Drain pending log deliveries on shutdown

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::forward::forward;
use crate::http::request::{absolute_url, OriginHeaders};
use crate::http::upstream::{ForwardBody, UpstreamClient};
use crate::lifecycle::{shutdown, BackgroundTasks};
use crate::observability::metrics;
use crate::telemetry::accumulator::RESPONSE_BODY_META;
use crate::telemetry::ingest::describe_error;
use crate::telemetry::{IngestClient, LogAccumulator, Origin, RequestInfo};

/// Errors while building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid ingestion endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub upstream: UpstreamClient,
    pub ingest: IngestClient,
    pub background: BackgroundTasks,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let ingest = IngestClient::new(reqwest::Client::new(), config.ingest.endpoint.parse()?);
        Self::with_parts(config, ingest, BackgroundTasks::new())
    }

    /// Create a server sharing an ingestion client and background registry
    /// with other subsystems.
    pub fn with_parts(
        config: RelayConfig,
        ingest: IngestClient,
        background: BackgroundTasks,
    ) -> Result<Self, ServerError> {
        let state = AppState {
            config: Arc::new(config),
            upstream: UpstreamClient::new()?,
            ingest,
            background,
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then wait for pending log
    /// deliveries.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        self.state.background.drain().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// One invocation: check origin headers and key, build the accumulator,
/// forward, and schedule the flush without waiting on it.
async fn relay_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();

    let origin_headers = match OriginHeaders::from_headers(request.headers()) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting request");
            metrics::record_rejected("missing_org");
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
    };

    let Some(api_key) = state.config.ingest.api_key.clone() else {
        tracing::error!("No ingestion key configured, rejecting request");
        metrics::record_rejected("missing_key");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Logging is not configured").into_response();
    };

    let (mut parts, body) = request.into_parts();
    let url = match absolute_url(&parts, &state.config.upstream.default_scheme) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting request");
            metrics::record_rejected("bad_url");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    match url.as_str().parse::<Uri>() {
        Ok(uri) => parts.uri = uri,
        Err(e) => {
            metrics::record_rejected("bad_url");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    }

    // Bodies are only read into memory when they have to be recorded
    let (body, captured_body) = if origin_headers.debug_content {
        match to_bytes(body, state.config.upstream.max_body_bytes).await {
            Ok(bytes) => {
                let captured = String::from_utf8_lossy(&bytes).into_owned();
                (ForwardBody::Buffered(bytes), Some(captured))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body for capture");
                metrics::record_rejected("body");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        }
    } else {
        (ForwardBody::from_inbound(body), None)
    };

    let origin = Origin::Request(RequestInfo::from_parts(&parts, &url, Some(peer)));
    let ingest_config = &state.config.ingest;
    let accumulator = LogAccumulator::new(
        api_key,
        &ingest_config.app_name,
        Some(ingest_config.environment.as_str()),
        Some(ingest_config.source.as_str()),
        Some(&origin),
        captured_body.as_deref(),
        Some(origin_headers.tags.as_str()),
    );
    let defaults = accumulator.rebuild_defaults(
        &origin_headers.name,
        Some(origin_headers.org.as_str()),
        Some(origin_headers.source.as_str()),
        Some(&origin),
        None,
    );
    accumulator.set_defaults(defaults);

    let request = Request::from_parts(parts, body);
    let response = accumulator
        .capture(relay(&state, request, &origin_headers, &accumulator, start_time))
        .await;

    let ingest = state.ingest.clone();
    state
        .background
        .spawn(async move { accumulator.flush(&ingest).await });

    response
}

/// Forward the request and log its outcome. Runs inside the capture scope.
async fn relay(
    state: &AppState,
    request: Request<ForwardBody>,
    origin_headers: &OriginHeaders,
    accumulator: &LogAccumulator,
    start_time: Instant,
) -> Response {
    let request = forward(
        request,
        origin_headers.redirect_host.as_deref(),
        origin_headers.redirect_port.as_deref(),
    );
    let method = request.method().clone();
    let destination = request.uri().to_string();

    tracing::debug!(method = %method, url = %destination, "Forwarding request");

    let response = match state.upstream.send(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Upstream request to {} failed: {}", destination, describe_error(&e));
            metrics::record_request(method.as_str(), 502, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = response.status();
    let response = if origin_headers.debug_content {
        let (parts, body) = response.into_parts();
        match to_bytes(body, state.config.upstream.max_body_bytes).await {
            Ok(bytes) => {
                accumulator.set_meta(
                    RESPONSE_BODY_META,
                    Some(String::from_utf8_lossy(&bytes).into_owned()),
                );
                Response::from_parts(parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::error!("Failed to read response body from {}: {}", destination, e);
                metrics::record_request(method.as_str(), 502, start_time);
                return (StatusCode::BAD_GATEWAY, "Upstream response failed").into_response();
            }
        }
    } else {
        response
    };

    if status.is_client_error() || status.is_server_error() {
        tracing::error!("{} {} responded {}", method, destination, status.as_u16());
    } else {
        tracing::info!("{} {} responded {}", method, destination, status.as_u16());
    }
    metrics::record_request(method.as_str(), status.as_u16(), start_time);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use tower::ServiceExt;

    fn router(config: RelayConfig) -> Router {
        let server = HttpServer::new(config).unwrap();
        HttpServer::build_router(server.state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
    }

    fn keyed_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.ingest.api_key = Some("key".to_string());
        config
    }

    #[tokio::test]
    async fn test_missing_org_returns_404() {
        let response = router(keyed_config())
            .oneshot(Request::get("/path").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Missing Origin-Org header");
    }

    #[tokio::test]
    async fn test_missing_key_returns_500() {
        let response = router(RelayConfig::default())
            .oneshot(
                Request::get("/")
                    .header("Origin-Org", "acme")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_only_when_captured() {
        let mut config = keyed_config();
        config.upstream.max_body_bytes = 4;
        let server = HttpServer::new(config).unwrap();
        let background = server.state.background.clone();
        let app = HttpServer::build_router(server.state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let response = app
            .oneshot(
                Request::post("/")
                    .header("Host", "example.com")
                    .header("Origin-Org", "acme")
                    .header("Debug-Content", "true")
                    .body(Body::from("too long"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(background.is_empty());
    }
}
