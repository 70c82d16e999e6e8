//! Test that responses are compressed for clients that accept it, and that
//! HTTPS responses are only compressed when enabled.

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING};

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;
use crate::pipeline::ENABLE_FOR_HTTPS_KEY;

fn app_compressing_https() -> TestApp {
    TestApp::with_configuration(
        HostEnvironment::Production,
        &[
            ("Tokens:Issuer", ISSUER),
            ("Tokens:Key", SECRET),
            (ENABLE_FOR_HTTPS_KEY, "true"),
        ],
    )
}

fn get_report(app: &TestApp, accept_encoding: Option<&str>) -> TestResponse {
    let mut builder = https_request("/report");
    if let Some(encoding) = accept_encoding {
        builder = builder.header(ACCEPT_ENCODING, encoding);
    }
    app.send(builder.body(Body::empty()).expect("request"))
}

#[test]
fn test_https_uncompressed_by_default() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = get_report(&app, Some("gzip, br"));

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.header(CONTENT_ENCODING).is_none());
    assert!(resp.body.starts_with("quarterly totals line"));
}

#[test]
fn test_gzip_when_accepted() {
    let app = app_compressing_https();

    let resp = get_report(&app, Some("gzip"));

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header(CONTENT_ENCODING), Some("gzip"));
}

#[test]
fn test_brotli_when_accepted() {
    let app = app_compressing_https();

    let resp = get_report(&app, Some("br"));

    assert_eq!(resp.header(CONTENT_ENCODING), Some("br"));
}

#[test]
fn test_identity_without_accept_encoding() {
    let app = app_compressing_https();

    let resp = get_report(&app, None);

    assert!(resp.header(CONTENT_ENCODING).is_none());
    assert!(resp.body.starts_with("quarterly totals line"));
}
