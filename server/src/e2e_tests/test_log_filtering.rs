//! Test that each sink drops the templates on its denylist and everything
//! below the minimum level.

use axum::body::Body;
use axum::http::header::AUTHORIZATION;

use crate::config::HostEnvironment;
use crate::e2e_tests::helpers::*;
use crate::logging::exclusion::{REQUEST_NOISE, SECONDARY_SINK_NOISE};
use crate::logging::templates;

#[test]
fn test_request_noise_reaches_no_sink() {
    let app = TestApp::new(HostEnvironment::Production);

    app.in_scope(|| {
        for template in REQUEST_NOISE {
            tracing::info!("{}", template);
        }
        tracing::info!("order 17 shipped");
    });

    for logs in [&app.primary_logs, &app.secondary_logs] {
        let contents = logs.contents();
        for template in REQUEST_NOISE {
            assert!(!contents.contains(template), "{template} leaked");
        }
        assert!(contents.contains("order 17 shipped"));
    }
}

#[test]
fn test_secondary_noise_is_trimmed_before_matching() {
    let app = TestApp::new(HostEnvironment::Production);

    app.in_scope(|| {
        for template in SECONDARY_SINK_NOISE {
            tracing::info!("  {}\t", template);
        }
    });

    let primary = app.primary_logs.contents();
    let secondary = app.secondary_logs.contents();
    for template in SECONDARY_SINK_NOISE {
        assert!(primary.contains(template), "{template} missing from primary");
        assert!(!secondary.contains(template), "{template} leaked to secondary");
    }
}

#[test]
fn test_events_below_information_are_dropped() {
    let app = TestApp::new(HostEnvironment::Production);

    app.in_scope(|| {
        tracing::debug!("recount scheduled");
        tracing::trace!("recount tick");
        tracing::warn!("stock running low");
    });

    for logs in [&app.primary_logs, &app.secondary_logs] {
        let contents = logs.contents();
        assert!(!contents.contains("recount"));
        assert!(contents.contains("stock running low"));
    }
}

#[test]
fn test_authorization_success_only_in_primary() {
    let app = TestApp::new(HostEnvironment::Production);

    let _ = app.send(
        https_request("/api/token")
            .header(AUTHORIZATION, format!("Bearer {}", token(SECRET, ISSUER, ISSUER)))
            .body(Body::empty())
            .expect("request"),
    );

    assert!(app.primary_logs.contents().contains(templates::AUTHORIZATION_SUCCEEDED));
    assert!(!app.secondary_logs.contents().contains(templates::AUTHORIZATION_SUCCEEDED));
}

#[test]
fn test_challenge_noise_only_in_primary() {
    let app = TestApp::new(HostEnvironment::Production);

    let _ = app.get_https("/api/session");

    let primary = app.primary_logs.contents();
    let secondary = app.secondary_logs.contents();
    for template in [templates::CHALLENGE_RESULT, templates::STATUS_CODE_RESULT] {
        assert!(primary.contains(template), "{template} missing from primary");
        assert!(!secondary.contains(template), "{template} leaked to secondary");
    }
    assert!(primary.contains(templates::SCHEME_CHALLENGED));
    assert!(secondary.contains(templates::SCHEME_CHALLENGED));
}

#[test]
fn test_redirect_is_logged_below_minimum_level() {
    let app = TestApp::new(HostEnvironment::Production);

    let _ = app.send(
        http_request("/", "example.com")
            .body(Body::empty())
            .expect("request"),
    );

    assert!(!app.primary_logs.contents().contains("Redirecting to"));
}
