//! Axum middleware enforcing authentication on a route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{AuthenticateResult, AuthenticationHandler, AuthenticationServices};
use crate::logging::templates;

/// Which scheme guards a route.
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    services: Arc<AuthenticationServices>,
    scheme: Option<String>,
}

impl AuthorizationPolicy {
    /// Guard with the registry's default scheme.
    #[must_use]
    pub const fn default_scheme(services: Arc<AuthenticationServices>) -> Self {
        Self {
            services,
            scheme: None,
        }
    }

    /// Guard with a named scheme.
    #[must_use]
    pub fn scheme(services: Arc<AuthenticationServices>, scheme: &str) -> Self {
        Self {
            services,
            scheme: Some(scheme.to_string()),
        }
    }
}

/// Middleware entry point that authenticates the request with the policy's
/// scheme.
///
/// On success the [`AuthenticatedUser`](super::AuthenticatedUser) is added
/// to the request extensions. Otherwise the scheme's challenge is returned
/// and the inner service is not called.
pub async fn authorize(
    State(policy): State<AuthorizationPolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    let handler = match policy.services.handler(policy.scheme.as_deref()) {
        Ok(handler) => handler,
        Err(e) => {
            tracing::error!(error = %e, "route references an unregistered scheme");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match handler.authenticate(request.headers()) {
        AuthenticateResult::Success(user) => {
            tracing::info!(
                user_name = user.display_name(),
                "{}",
                templates::AUTHORIZATION_SUCCEEDED
            );
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        AuthenticateResult::NoResult => challenge(handler, &request, None),
        AuthenticateResult::Fail(reason) => {
            tracing::info!(
                authentication_scheme = handler.scheme(),
                failure_message = %reason,
                "{}",
                templates::AUTHORIZATION_FAILED
            );
            challenge(handler, &request, Some(&reason))
        }
    }
}

fn challenge(handler: &AuthenticationHandler, request: &Request, failure: Option<&str>) -> Response {
    tracing::info!(schemes = handler.scheme(), "{}", templates::CHALLENGE_RESULT);
    tracing::info!(
        authentication_scheme = handler.scheme(),
        "{}",
        templates::SCHEME_CHALLENGED
    );
    handler.challenge(request.uri(), failure)
}
