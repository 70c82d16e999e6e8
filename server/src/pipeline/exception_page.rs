//! Responses for handlers that panic.
//!
//! In development the response carries the panic message, its source
//! location and a backtrace. Everywhere else the client gets an empty 500.
//!
//! The backtrace has to be captured while the panicking thread is still
//! unwinding, so a panic hook records a [`PanicReport`] into a thread-local
//! that the catch handler on the same thread then takes.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::sync::Once;

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::logging::templates;

static PANIC_CAPTURE: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

/// What is known about a panic that escaped a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

impl PanicReport {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: payload_message(payload),
            location: None,
            backtrace: None,
        }
    }

    /// Plain-text developer page.
    #[must_use]
    pub fn render(&self) -> String {
        let mut page = String::from("An unhandled exception occurred while processing the request.\n\n");
        page.push_str(&self.message);
        page.push('\n');
        if let Some(location) = &self.location {
            page.push_str("   at ");
            page.push_str(location);
            page.push('\n');
        }
        page.push_str("\nStack trace:\n");
        page.push_str(self.backtrace.as_deref().unwrap_or("(not captured)"));
        page.push('\n');
        page
    }
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Install the panic hook that records reports for the developer page.
///
/// Idempotent. The previously installed hook still runs afterwards.
pub fn install_panic_capture() {
    PANIC_CAPTURE.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let report = PanicReport {
                message: payload_message(info.payload()),
                location: info.location().map(ToString::to_string),
                backtrace: Some(Backtrace::force_capture().to_string()),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
            previous(info);
        }));
    });
}

/// Text of a panic payload. `panic!` produces either `&str` or `String`.
#[must_use]
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// The report recorded for `payload`, if the hook saw this panic.
fn take_report(payload: &(dyn Any + Send)) -> PanicReport {
    let fallback = PanicReport::from_payload(payload);
    LAST_PANIC
        .with(|slot| slot.borrow_mut().take())
        .filter(|report| report.message == fallback.message)
        .unwrap_or(fallback)
}

/// Catch handler producing the developer page.
pub fn developer_exception_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let report = take_report(payload.as_ref());
    tracing::error!(exception = %report, "{}", templates::UNHANDLED_EXCEPTION);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.render(),
    )
        .into_response()
}

/// Catch handler producing an empty 500.
pub fn opaque_server_error(payload: Box<dyn Any + Send + 'static>) -> Response {
    let report = take_report(payload.as_ref());
    tracing::error!(exception = %report, "{}", templates::UNHANDLED_EXCEPTION);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn boom() -> &'static str {
        panic!("ledger out of balance")
    }

    async fn body_text(router: Router) -> (StatusCode, String) {
        let response = router
            .oneshot(HttpRequest::builder().uri("/boom").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf-8"))
    }

    #[test]
    fn test_payload_message() {
        let borrowed: Box<dyn Any + Send> = Box::new("static text");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        let other: Box<dyn Any + Send> = Box::new(7_u32);

        assert_eq!(payload_message(borrowed.as_ref()), "static text");
        assert_eq!(payload_message(owned.as_ref()), "owned text");
        assert_eq!(payload_message(other.as_ref()), "panic with a non-string payload");
    }

    #[test]
    fn test_render_includes_location_and_trace() {
        let report = PanicReport {
            message: "bad state".to_string(),
            location: Some("src/lib.rs:1:1".to_string()),
            backtrace: Some("frame 0".to_string()),
        };

        let page = report.render();
        assert!(page.contains("bad state"));
        assert!(page.contains("   at src/lib.rs:1:1"));
        assert!(page.contains("Stack trace:\nframe 0"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_developer_page_shows_panic_detail() {
        install_panic_capture();
        let router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(developer_exception_response));

        let (status, body) = body_text(router).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("ledger out of balance"));
        assert!(body.contains("exception_page.rs"));
        assert!(body.contains("Stack trace:"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_opaque_error_has_empty_body() {
        let router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(opaque_server_error));

        let (status, body) = body_text(router).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }
}
