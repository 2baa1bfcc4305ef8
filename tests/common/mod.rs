//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use edge_relay::config::{ObservabilityConfig, RelayConfig};
use edge_relay::lifecycle::Shutdown;
use edge_relay::observability::logging;
use edge_relay::HttpServer;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

pub const API_KEY: &str = "test-ingest-key";

/// Install the relay's default subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = logging::init_logging(&ObservabilityConfig::default());
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start a backend that echoes the request as JSON. The status can be
/// chosen with an `x-mock-status` request header.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
        let status = headers
            .get("x-mock-status")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u16>().ok())
            .and_then(|v| StatusCode::from_u16(v).ok())
            .unwrap_or(StatusCode::OK);
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (
            status,
            Json(json!({
                "method": method.as_str(),
                "path": uri.path(),
                "host": header("host"),
                "custom": header("x-custom"),
                "body": String::from_utf8_lossy(&body),
            })),
        )
    }

    serve(Router::new().fallback(echo)).await
}

/// One request received by the mock ingestion endpoint.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Delivery {
    pub fn query_values(&self, key: &str) -> Vec<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    pub fn lines(&self) -> Vec<Value> {
        let body: Value = serde_json::from_slice(&self.body).unwrap();
        body["lines"].as_array().cloned().unwrap_or_default()
    }
}

pub type Deliveries = Arc<Mutex<Vec<Delivery>>>;

/// Start a mock ingestion endpoint at `/logs/ingest` that records every
/// delivery.
pub async fn start_mock_ingest() -> (SocketAddr, Deliveries) {
    async fn ingest(
        State(deliveries): State<Deliveries>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        deliveries.lock().unwrap().push(Delivery {
            query: query.unwrap_or_default(),
            headers,
            body,
        });
        StatusCode::OK
    }

    let deliveries: Deliveries = Arc::default();
    let router = Router::new()
        .route("/logs/ingest", post(ingest))
        .with_state(deliveries.clone());
    (serve(router).await, deliveries)
}

/// Start a mock ingestion endpoint that holds every delivery until the
/// returned gate is notified. Deliveries are recorded once released.
pub async fn start_gated_ingest() -> (SocketAddr, Deliveries, Arc<Notify>) {
    async fn ingest(
        State((deliveries, gate)): State<(Deliveries, Arc<Notify>)>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        gate.notified().await;
        deliveries.lock().unwrap().push(Delivery {
            query: query.unwrap_or_default(),
            headers,
            body,
        });
        StatusCode::OK
    }

    let deliveries: Deliveries = Arc::default();
    let gate = Arc::new(Notify::new());
    let router = Router::new()
        .route("/logs/ingest", post(ingest))
        .with_state((deliveries.clone(), gate.clone()));
    (serve(router).await, deliveries, gate)
}

/// Wait until at least `count` deliveries arrived.
pub async fn wait_for_deliveries(deliveries: &Deliveries, count: usize) -> Vec<Delivery> {
    for _ in 0..100 {
        {
            let seen = deliveries.lock().unwrap();
            if seen.len() >= count {
                return seen.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {count} deliveries");
}

pub fn relay_config(ingest_addr: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.default_scheme = "http".to_string();
    config.ingest.endpoint = format!("http://{ingest_addr}/logs/ingest");
    config.ingest.api_key = Some(API_KEY.to_string());
    config
}

/// Start the relay; returns its address and the shutdown handle.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
