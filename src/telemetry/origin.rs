//! What started an invocation: an HTTP request or a scheduled trigger.
//!
//! # Responsibilities
//! - Snapshot the network/client attributes the log lines carry
//! - Derive the host label the ingestion service files lines under

use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Host label used for scheduled invocations.
pub const SCHEDULED_HOST_LABEL: &str = "scheduled";

/// Host label used when no origin is known.
pub const UNKNOWN_HOST_LABEL: &str = "unknown";

/// Client and network attributes of an inbound request.
///
/// Edge-only attributes (ASN, TLS, trust score) stay `None` unless the
/// hosting platform supplies them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    #[serde(skip)]
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colo: Option<String>,
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_forwarded_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_ray: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_trust_score: Option<u32>,
    pub headers: BTreeMap<String, String>,
}

impl RequestInfo {
    /// Build from the inbound request head.
    ///
    /// `url` is the absolute URL the request was addressed to; `peer` is the
    /// socket address used when no `CF-Connecting-IP` header is present.
    pub fn from_parts(parts: &Parts, url: &url::Url, peer: Option<SocketAddr>) -> Self {
        let headers = &parts.headers;
        let cf_ray = header_str(headers, "cf-ray");
        // Ray IDs end in the colo code: "8a1b2c3d4e5f-LHR"
        let colo = cf_ray
            .as_deref()
            .and_then(|ray| ray.rsplit_once('-'))
            .map(|(_, colo)| colo.to_string());

        Self {
            hostname: url.host_str().unwrap_or_default().to_string(),
            user_agent: header_str(headers, "user-agent"),
            referer: header_str(headers, "referer"),
            ip: header_str(headers, "cf-connecting-ip")
                .or_else(|| peer.map(|addr| addr.ip().to_string())),
            country_code: header_str(headers, "cf-ipcountry"),
            colo,
            url: url.to_string(),
            method: parts.method.to_string(),
            x_forwarded_for: header_str(headers, "x-forwarded-for"),
            asn: None,
            cf_ray,
            tls_cipher: None,
            tls_version: None,
            client_trust_score: None,
            headers: snapshot_headers(headers),
        }
    }
}

/// The two ways an invocation can start.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    Request(RequestInfo),
    Scheduled {
        /// Epoch milliseconds the trigger was scheduled for.
        scheduled_time: u64,
    },
}

impl Origin {
    pub fn host_label(&self) -> String {
        match self {
            Origin::Request(info) => info.hostname.clone(),
            Origin::Scheduled { .. } => SCHEDULED_HOST_LABEL.to_string(),
        }
    }

    /// Default `meta` record for lines of this invocation.
    pub fn meta(&self) -> Map<String, Value> {
        match self {
            Origin::Request(info) => match serde_json::to_value(info) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Origin::Scheduled { scheduled_time } => {
                let mut meta = Map::new();
                meta.insert("timestamp".to_string(), Value::from(*scheduled_time));
                meta
            }
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn snapshot_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut snapshot: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        snapshot
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn parts(req: Request<Body>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn test_request_info_from_headers() {
        let req = Request::builder()
            .method("POST")
            .uri("/hook")
            .header("user-agent", "curl/8.0")
            .header("cf-connecting-ip", "203.0.113.9")
            .header("cf-ipcountry", "GB")
            .header("cf-ray", "8a1b2c3d4e5f-LHR")
            .header("accept", "text/plain")
            .header("accept", "application/json")
            .body(Body::empty())
            .unwrap();
        let url: url::Url = "https://api.example.com/hook".parse().unwrap();
        let info = RequestInfo::from_parts(&parts(req), &url, None);

        assert_eq!(info.hostname, "api.example.com");
        assert_eq!(info.method, "POST");
        assert_eq!(info.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(info.colo.as_deref(), Some("LHR"));
        assert_eq!(info.country_code.as_deref(), Some("GB"));
        assert_eq!(info.headers["accept"], "text/plain, application/json");
    }

    #[test]
    fn test_peer_ip_fallback() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let url: url::Url = "http://localhost/".parse().unwrap();
        let peer: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        let info = RequestInfo::from_parts(&parts(req), &url, Some(peer));
        assert_eq!(info.ip.as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn test_request_meta_omits_missing_attributes() {
        let info = RequestInfo {
            hostname: "h".into(),
            url: "https://h/".into(),
            method: "GET".into(),
            ..Default::default()
        };
        let meta = Origin::Request(info).meta();
        assert_eq!(meta["url"], "https://h/");
        assert!(!meta.contains_key("asn"));
        assert!(!meta.contains_key("hostname"));
    }

    #[test]
    fn test_scheduled_origin() {
        let origin = Origin::Scheduled {
            scheduled_time: 1_700_000_000_000,
        };
        assert_eq!(origin.host_label(), SCHEDULED_HOST_LABEL);
        let meta = origin.meta();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["timestamp"], 1_700_000_000_000u64);
    }
}
