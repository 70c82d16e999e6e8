//! Bearer-token authentication scheme.
//!
//! Reads `Authorization: Bearer <token>`, validates the token with
//! [`verify_token`], and challenges with `401` plus a `WWW-Authenticate`
//! header.

use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use super::jwt::{TokenValidationParameters, verify_token};
use super::{AuthError, AuthenticateResult, AuthenticatedUser};
use crate::configuration::Configuration;

/// Configuration key holding the issuer, also used as the audience.
pub const ISSUER_KEY: &str = "Tokens:Issuer";
/// Configuration key holding the symmetric signing secret.
pub const SIGNING_KEY_KEY: &str = "Tokens:Key";

const BEARER_PREFIX: &str = "Bearer ";

/// Options of the bearer scheme.
#[derive(Debug, Clone)]
pub struct JwtBearerOptions {
    /// Whether authority metadata must be fetched over HTTPS.
    ///
    /// Left `false`: metadata over plain HTTP is accepted. This is an
    /// insecure setting and is logged as such when the scheme is registered.
    pub require_https_metadata: bool,
    /// Keep the raw token on the authenticated request.
    pub save_token: bool,
    pub token_validation_parameters: TokenValidationParameters,
}

impl JwtBearerOptions {
    /// Options built from `Tokens:Issuer` and `Tokens:Key`.
    ///
    /// The issuer doubles as the audience. The signing key is the UTF-8
    /// encoding of the configured secret.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if `Tokens:Key` is missing or empty.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, AuthError> {
        let secret = configuration.required(SIGNING_KEY_KEY)?;
        let issuer = configuration
            .get(ISSUER_KEY)
            .filter(|issuer| !issuer.is_empty());
        if issuer.is_none() {
            tracing::warn!(
                key = ISSUER_KEY,
                "issuer is not configured; every bearer token will be rejected"
            );
        }

        Ok(Self {
            require_https_metadata: false,
            save_token: true,
            token_validation_parameters: TokenValidationParameters::symmetric(
                issuer.clone(),
                issuer,
                &secret,
            ),
        })
    }
}

/// Handler of a registered bearer scheme.
#[derive(Debug, Clone)]
pub struct JwtBearerHandler {
    scheme: String,
    options: JwtBearerOptions,
}

impl JwtBearerHandler {
    #[must_use]
    pub const fn new(scheme: String, options: JwtBearerOptions) -> Self {
        Self { scheme, options }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub const fn options(&self) -> &JwtBearerOptions {
        &self.options
    }

    /// Authenticate the request from its headers.
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthenticateResult {
        let Some(token) = bearer_token(headers) else {
            return AuthenticateResult::NoResult;
        };

        match verify_token(token, &self.options.token_validation_parameters) {
            Ok(claims) => AuthenticateResult::Success(AuthenticatedUser {
                scheme: self.scheme.clone(),
                subject: claims.sub.or(claims.unique_name),
                token: self.options.save_token.then(|| token.to_string()),
            }),
            Err(e) => AuthenticateResult::Fail(e.to_string()),
        }
    }

    /// Respond to an unauthenticated request.
    #[must_use]
    pub fn challenge(&self, failure: Option<&str>) -> Response {
        let challenge = failure.map_or_else(
            || HeaderValue::from_static("Bearer"),
            |reason| {
                HeaderValue::from_str(&format!(
                    "Bearer error=\"invalid_token\", error_description=\"{reason}\""
                ))
                .unwrap_or_else(|_| HeaderValue::from_static("Bearer error=\"invalid_token\""))
            },
        );
        (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, challenge)]).into_response()
    }
}

/// The token of an `Authorization: Bearer` header, if any.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}
