//! Test that plain-HTTP requests are redirected to HTTPS before any route
//! runs.

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{LOCATION, STRICT_TRANSPORT_SECURITY};

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;
use crate::pipeline::RequestScheme;

#[test]
fn test_every_route_is_redirected() {
    let app = TestApp::new(HostEnvironment::Production);

    for path in ["/", "/api/session", "/api/token?full=true", "/boom", "/missing"] {
        let resp = app.send(
            http_request(path, "example.com:5000")
                .body(Body::empty())
                .expect("request"),
        );

        assert_eq!(resp.status, StatusCode::TEMPORARY_REDIRECT, "path {path}");
        assert_eq!(
            resp.header(LOCATION),
            Some(format!("https://example.com{path}").as_str()),
            "path {path}"
        );
        assert!(resp.header(STRICT_TRANSPORT_SECURITY).is_none());
    }
}

#[test]
fn test_redirect_happens_in_development_too() {
    let app = TestApp::new(HostEnvironment::Development);

    let resp = app.send(http_request("/", "localhost:5000").body(Body::empty()).expect("request"));

    assert_eq!(resp.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.header(LOCATION), Some("https://localhost/"));
}

#[test]
fn test_terminated_tls_is_not_redirected() {
    let app = TestApp::new(HostEnvironment::Production);
    let mut request = http_request("/", "example.com")
        .body(Body::empty())
        .expect("request");
    request.extensions_mut().insert(RequestScheme::Https);

    let resp = app.send(request);

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header(STRICT_TRANSPORT_SECURITY), Some("max-age=2592000"));
}
