//! Scheme and host of an incoming request.

use axum::http::Request;
use axum::http::header::HOST;

/// Transport scheme a request arrived over.
///
/// A TLS terminator in front of the router marks HTTPS requests by inserting
/// `RequestScheme::Https` into the request extensions. Without the marker
/// the scheme of an absolute request URI is used, and plain HTTP otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScheme {
    Http,
    Https,
}

#[must_use]
pub fn request_scheme<B>(request: &Request<B>) -> RequestScheme {
    if let Some(scheme) = request.extensions().get::<RequestScheme>() {
        return *scheme;
    }
    match request.uri().scheme_str() {
        Some(scheme) if scheme.eq_ignore_ascii_case("https") => RequestScheme::Https,
        _ => RequestScheme::Http,
    }
}

/// The `Host` header, or the authority of an absolute request URI.
#[must_use]
pub fn request_host<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
        .filter(|host| !host.is_empty())
}

/// Strip a trailing `:port` from a host. Bracketed IPv6 hosts keep their
/// brackets.
#[must_use]
pub fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_extension_wins() {
        let mut request = Request::builder()
            .uri("http://example.com/")
            .body(())
            .expect("request");
        request.extensions_mut().insert(RequestScheme::Https);

        assert_eq!(request_scheme(&request), RequestScheme::Https);
    }

    #[test]
    fn test_scheme_from_uri() {
        let https = Request::builder().uri("https://example.com/a").body(()).expect("request");
        let relative = Request::builder().uri("/a").body(()).expect("request");

        assert_eq!(request_scheme(&https), RequestScheme::Https);
        assert_eq!(request_scheme(&relative), RequestScheme::Http);
    }

    #[test]
    fn test_host_prefers_header() {
        let request = Request::builder()
            .uri("http://uri-host/")
            .header(HOST, "header-host:8080")
            .body(())
            .expect("request");
        assert_eq!(request_host(&request), Some("header-host:8080"));

        let request = Request::builder().uri("http://uri-host/").body(()).expect("request");
        assert_eq!(request_host(&request), Some("uri-host"));

        let request = Request::builder().uri("/").body(()).expect("request");
        assert_eq!(request_host(&request), None);
    }

    #[test]
    fn test_host_without_port() {
        assert_eq!(host_without_port("example.com:8080"), "example.com");
        assert_eq!(host_without_port("example.com"), "example.com");
        assert_eq!(host_without_port("[::1]:5001"), "[::1]");
        assert_eq!(host_without_port("[::1]"), "[::1]");
        assert_eq!(host_without_port("127.0.0.1:80"), "127.0.0.1");
    }
}
