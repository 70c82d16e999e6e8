//! Redirect plain-HTTP requests to HTTPS.
//!
//! # Invariants
//! - HTTPS requests always pass through untouched.
//! - When the HTTPS port is unknown, requests pass through and a warning is
//!   logged once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::request_info::{RequestScheme, host_without_port, request_host, request_scheme};
use crate::logging::templates;

/// Port implied by an `https://` URL.
const DEFAULT_HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsRedirectionOptions {
    /// Status of the redirect response.
    pub redirect_status_code: StatusCode,
    /// Port of the HTTPS endpoint, if known.
    pub https_port: Option<u16>,
}

impl Default for HttpsRedirectionOptions {
    fn default() -> Self {
        Self {
            redirect_status_code: StatusCode::TEMPORARY_REDIRECT,
            https_port: None,
        }
    }
}

/// Middleware state.
#[derive(Debug)]
pub struct HttpsRedirection {
    options: HttpsRedirectionOptions,
    warned_unknown_port: AtomicBool,
}

impl HttpsRedirection {
    #[must_use]
    pub const fn new(options: HttpsRedirectionOptions) -> Self {
        Self {
            options,
            warned_unknown_port: AtomicBool::new(false),
        }
    }

    /// Where a plain-HTTP request should be sent, if it should be redirected.
    fn location<B>(&self, request: &Request<B>) -> Option<String> {
        if request_scheme(request) == RequestScheme::Https {
            return None;
        }
        let Some(port) = self.options.https_port else {
            if !self.warned_unknown_port.swap(true, Ordering::Relaxed) {
                tracing::warn!("{}", templates::HTTPS_PORT_UNKNOWN);
            }
            return None;
        };
        let host = host_without_port(request_host(request)?);
        let path_and_query = request
            .uri()
            .path_and_query()
            .map_or("/", |path_and_query| path_and_query.as_str());
        Some(https_location(host, port, path_and_query))
    }
}

/// The HTTPS URL for `host` and `path_and_query`. Port 443 is left implicit.
#[must_use]
pub fn https_location(host: &str, port: u16, path_and_query: &str) -> String {
    if port == DEFAULT_HTTPS_PORT {
        format!("https://{host}{path_and_query}")
    } else {
        format!("https://{host}:{port}{path_and_query}")
    }
}

/// Middleware entry point redirecting plain-HTTP requests.
pub async fn redirect_to_https(
    State(redirection): State<Arc<HttpsRedirection>>,
    request: Request,
    next: Next,
) -> Response {
    match redirection.location(&request) {
        Some(location) => {
            tracing::debug!(redirect = %location, "{}", templates::REDIRECTING_TO_HTTPS);
            (
                redirection.options.redirect_status_code,
                [(LOCATION, location)],
            )
                .into_response()
        }
        None => next.run(request).await,
    }
}
