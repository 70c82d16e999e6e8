//! Application routes.

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use serde::Serialize;

use crate::auth::{AuthenticatedUser, AuthenticationServices, AuthorizationPolicy, BEARER_SCHEME, authorize};

/// Identity echoed back to an authenticated caller.
#[derive(Debug, Serialize)]
pub struct Identity {
    pub scheme: String,
    pub name: String,
}

impl From<&AuthenticatedUser> for Identity {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            scheme: user.scheme.clone(),
            name: user.display_name().to_string(),
        }
    }
}

/// Routes:
/// - `GET /`: public.
/// - `GET /api/session`: guarded by the default scheme.
/// - `GET /api/token`: guarded by the bearer scheme.
#[must_use]
#[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
pub fn router(authentication: Arc<AuthenticationServices>) -> Router {
    let session = Router::new()
        .route("/api/session", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            AuthorizationPolicy::default_scheme(Arc::clone(&authentication)),
            authorize,
        ));
    let token = Router::new()
        .route("/api/token", get(whoami))
        .route_layer(middleware::from_fn_with_state(
            AuthorizationPolicy::scheme(authentication, BEARER_SCHEME),
            authorize,
        ));

    Router::new()
        .route("/", get(index))
        .merge(session)
        .merge(token)
}

async fn index() -> &'static str {
    "Hello World!"
}

async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> Json<Identity> {
    Json(Identity::from(&user))
}
