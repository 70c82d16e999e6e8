//! Test that the cookie-protected route answers unauthenticated requests
//! with a bare 401 instead of a login redirect.

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{LOCATION, SET_COOKIE};

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;

#[test]
fn test_no_cookie_gets_empty_401() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.get_https("/api/session");

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.header(LOCATION).is_none());
    assert!(resp.body.is_empty());
}

#[test]
fn test_tampered_cookie_gets_empty_401() {
    let app = TestApp::new(HostEnvironment::Production);
    let cookie = app.session_cookie("alice");
    let (name, value) = cookie.split_once('=').expect("name=value");
    let tampered = format!("{name}=A{value}");

    let resp = app.send(
        with_cookie(https_request("/api/session"), &tampered)
            .body(Body::empty())
            .expect("request"),
    );

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.header(LOCATION).is_none());
}

#[test]
fn test_signed_in_session_is_accepted() {
    let app = TestApp::new(HostEnvironment::Production);
    let cookie = app.session_cookie("alice");

    let resp = app.send(
        with_cookie(https_request("/api/session"), &cookie)
            .body(Body::empty())
            .expect("request"),
    );

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("\"scheme\":\"Cookies\""));
    assert!(resp.body.contains("\"name\":\"alice\""));
    assert!(resp.header(SET_COOKIE).is_none());
}

#[test]
fn test_session_from_another_key_is_rejected() {
    let issuing = TestApp::new(HostEnvironment::Production);
    let verifying = TestApp::new(HostEnvironment::Production);
    let cookie = issuing.session_cookie("alice");

    let resp = verifying.send(
        with_cookie(https_request("/api/session"), &cookie)
            .body(Body::empty())
            .expect("request"),
    );

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_public_route_needs_no_credentials() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.get_https("/");

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "Hello World!");
}
