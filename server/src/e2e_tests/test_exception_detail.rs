//! Test that exception detail reaches the client only in development, and
//! that HSTS replaces the developer page everywhere else.

use axum::http::StatusCode;
use axum::http::header::STRICT_TRANSPORT_SECURITY;

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;

#[test]
fn test_development_shows_stack_trace() {
    let app = TestApp::new(HostEnvironment::Development);

    let resp = app.get_https("/boom");

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body.contains("inventory count went negative"));
    assert!(resp.body.contains("Stack trace:"));
    assert!(resp.body.contains("helpers.rs"));
}

#[test]
fn test_production_hides_exception() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.get_https("/boom");

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body.is_empty());
}

#[test]
fn test_exception_is_logged_in_every_environment() {
    for environment in [HostEnvironment::Development, HostEnvironment::Production] {
        let app = TestApp::new(environment);

        let _ = app.get_https("/boom");

        assert!(
            app.primary_logs
                .contents()
                .contains("An unhandled exception has occurred while executing the request.")
        );
    }
}

#[test]
fn test_production_sends_hsts() {
    let app = TestApp::new(HostEnvironment::Production);

    let resp = app.get_https("/");

    assert_eq!(resp.header(STRICT_TRANSPORT_SECURITY), Some("max-age=2592000"));
}

#[test]
fn test_development_sends_no_hsts() {
    let app = TestApp::new(HostEnvironment::Development);

    let resp = app.get_https("/");

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.header(STRICT_TRANSPORT_SECURITY).is_none());
}
