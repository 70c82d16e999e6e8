//! HTTP Strict Transport Security.
//!
//! Adds `Strict-Transport-Security` to responses of HTTPS requests so that
//! clients use HTTPS for the configured duration on later visits.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::STRICT_TRANSPORT_SECURITY;
use axum::middleware::Next;
use axum::response::Response;

use super::request_info::{RequestScheme, host_without_port, request_host, request_scheme};

/// Thirty days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Hosts never sent the header, so local development is not pinned to HTTPS.
pub const DEFAULT_EXCLUDED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HstsOptions {
    pub max_age: Duration,
    pub include_subdomains: bool,
    pub preload: bool,
    pub excluded_hosts: Vec<String>,
}

impl Default for HstsOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            include_subdomains: false,
            preload: false,
            excluded_hosts: DEFAULT_EXCLUDED_HOSTS.iter().map(|h| (*h).to_string()).collect(),
        }
    }
}

impl HstsOptions {
    /// Value of the `Strict-Transport-Security` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.max_age.as_secs());
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        value
    }

    #[must_use]
    pub fn is_excluded(&self, host: &str) -> bool {
        let host = host_without_port(host);
        self.excluded_hosts
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(host))
    }
}

/// Middleware entry point adding the HSTS header to HTTPS responses.
pub async fn enforce_hsts(
    State(options): State<Arc<HstsOptions>>,
    request: Request,
    next: Next,
) -> Response {
    let applies = request_scheme(&request) == RequestScheme::Https
        && !request_host(&request).is_some_and(|host| options.is_excluded(host));

    let mut response = next.run(request).await;
    if applies {
        match HeaderValue::from_str(&options.header_value()) {
            Ok(value) => {
                response.headers_mut().insert(STRICT_TRANSPORT_SECURITY, value);
            }
            Err(e) => tracing::warn!(error = %e, "invalid HSTS header value"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::{Router, middleware};
    use tower::ServiceExt;

    fn app(options: HstsOptions) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(Arc::new(options), enforce_hsts))
    }

    async fn hsts_header(options: HstsOptions, uri: &str) -> Option<String> {
        let response = app(options)
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        response
            .headers()
            .get(STRICT_TRANSPORT_SECURITY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[test]
    fn test_default_header_value() {
        assert_eq!(HstsOptions::default().header_value(), "max-age=2592000");
    }

    #[test]
    fn test_header_value_with_directives() {
        let options = HstsOptions {
            max_age: Duration::from_secs(60),
            include_subdomains: true,
            preload: true,
            ..HstsOptions::default()
        };
        assert_eq!(options.header_value(), "max-age=60; includeSubDomains; preload");
    }

    #[test]
    fn test_loopback_hosts_are_excluded() {
        let options = HstsOptions::default();

        assert!(options.is_excluded("localhost"));
        assert!(options.is_excluded("LOCALHOST:5001"));
        assert!(options.is_excluded("127.0.0.1:443"));
        assert!(options.is_excluded("[::1]:443"));
        assert!(!options.is_excluded("example.com"));
    }

    #[tokio::test]
    async fn test_header_on_https_requests_only() {
        assert_eq!(
            hsts_header(HstsOptions::default(), "https://example.com/").await,
            Some("max-age=2592000".to_string())
        );
        assert_eq!(hsts_header(HstsOptions::default(), "http://example.com/").await, None);
    }

    #[tokio::test]
    async fn test_no_header_for_excluded_host() {
        assert_eq!(hsts_header(HstsOptions::default(), "https://localhost/").await, None);
    }
}
