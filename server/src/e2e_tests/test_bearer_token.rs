//! Test that bearer tokens are validated against the configured issuer,
//! audience and signing key.

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;

fn get_token_route(app: &TestApp, token: &str) -> TestResponse {
    app.send(
        https_request("/api/token")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request"),
    )
}

#[test]
fn test_valid_token_is_accepted() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = get_token_route(&app, &token(SECRET, ISSUER, ISSUER));

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("\"scheme\":\"Bearer\""));
    assert!(resp.body.contains("\"name\":\"alice\""));
}

#[test]
fn test_wrong_signature_is_rejected() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = get_token_route(&app, &token("not-the-secret", ISSUER, ISSUER));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(
        resp.header(WWW_AUTHENTICATE)
            .is_some_and(|v| v.starts_with("Bearer error=\"invalid_token\""))
    );
}

#[test]
fn test_wrong_issuer_is_rejected() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = get_token_route(&app, &token(SECRET, "Y", ISSUER));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_wrong_audience_is_rejected() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = get_token_route(&app, &token(SECRET, ISSUER, "Y"));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_missing_token_gets_bare_bearer_challenge() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.get_https("/api/token");

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header(WWW_AUTHENTICATE), Some("Bearer"));
}

#[test]
fn test_unconfigured_issuer_rejects_every_token() {
    let app = TestApp::with_configuration(HostEnvironment::Production, &[("Tokens:Key", SECRET)]);

    let resp = get_token_route(&app, &token(SECRET, ISSUER, ISSUER));

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_bearer_token_does_not_open_cookie_route() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.send(
        https_request("/api/session")
            .header(AUTHORIZATION, format!("Bearer {}", token(SECRET, ISSUER, ISSUER)))
            .body(Body::empty())
            .expect("request"),
    );

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
