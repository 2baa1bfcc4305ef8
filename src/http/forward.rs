//! Outbound request construction.
//!
//! # Responsibilities
//! - Re-point a request at an overridden host and/or port
//! - Keep method, headers, extensions and body exactly as received
//!
//! # Design Decisions
//! - Pure transformation: the body is moved, never read, so the
//!   forwarded request owns the only consumable stream
//! - Overrides that cannot be applied leave the URL untouched

use axum::http::{Request, Uri};
use url::Url;

/// Replace the hostname and/or port of `request`'s URL.
///
/// Empty overrides count as absent. With neither override the request is
/// returned as-is.
pub fn forward<B>(request: Request<B>, host: Option<&str>, port: Option<&str>) -> Request<B> {
    let host = host.filter(|h| !h.is_empty());
    let port = port.filter(|p| !p.is_empty());
    if host.is_none() && port.is_none() {
        return request;
    }

    let (mut parts, body) = request.into_parts();
    match rewrite_uri(&parts.uri, host, port) {
        Some(uri) => parts.uri = uri,
        None => tracing::warn!(
            uri = %parts.uri,
            host = ?host,
            port = ?port,
            "Redirect override could not be applied, keeping original URL"
        ),
    }
    Request::from_parts(parts, body)
}

fn rewrite_uri(uri: &Uri, host: Option<&str>, port: Option<&str>) -> Option<Uri> {
    let mut url = Url::parse(&uri.to_string()).ok()?;
    if let Some(host) = host {
        url.set_host(Some(host)).ok()?;
    }
    if let Some(port) = port {
        let port: u16 = port.parse().ok()?;
        url.set_port(Some(port)).ok()?;
    }
    url.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Method;

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header("x-custom", "1")
            .header("content-type", "application/json")
            .body(Body::from("{\"hello\":true}"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_host_and_port_replaced() {
        let out = forward(
            request("https://old.example.com:443/path"),
            Some("new.example.com"),
            Some("8443"),
        );
        assert_eq!(out.uri().to_string(), "https://new.example.com:8443/path");
        assert_eq!(out.method(), &Method::PUT);
        assert_eq!(out.headers()["x-custom"], "1");
        assert_eq!(out.headers()["content-type"], "application/json");

        let body = to_bytes(out.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"hello\":true}");
    }

    #[test]
    fn test_only_host() {
        let out = forward(request("http://old.example.com:8080/a?b=c"), Some("new.example.com"), None);
        assert_eq!(out.uri().to_string(), "http://new.example.com:8080/a?b=c");
    }

    #[test]
    fn test_only_port() {
        let out = forward(request("http://old.example.com/a"), None, Some("9000"));
        assert_eq!(out.uri().to_string(), "http://old.example.com:9000/a");
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let out = forward(request("https://old.example.com/a"), None, Some(""));
        assert_eq!(out.uri().to_string(), "https://old.example.com/a");
        assert_eq!(out.headers().len(), 2);
    }

    #[test]
    fn test_bad_port_keeps_url() {
        let out = forward(request("https://old.example.com/a"), Some("new.example.com"), Some("http"));
        assert_eq!(out.uri().to_string(), "https://old.example.com/a");
    }
}
