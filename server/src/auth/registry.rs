//! Authentication scheme registry.
//!
//! Schemes are registered by name through an [`AuthenticationBuilder`] at
//! startup. The resulting [`AuthenticationServices`] is immutable and shared
//! by every request.

use std::collections::HashMap;

use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum_extra::extract::cookie::Key;
use time::OffsetDateTime;

use super::bearer::{JwtBearerHandler, JwtBearerOptions};
use super::cookie::{CookieAuthenticationOptions, CookieHandler};
use super::{AuthError, AuthenticateResult};

/// A registered scheme.
#[derive(Debug, Clone)]
pub enum AuthenticationHandler {
    JwtBearer(JwtBearerHandler),
    Cookie(CookieHandler),
}

impl AuthenticationHandler {
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::JwtBearer(handler) => handler.scheme(),
            Self::Cookie(handler) => handler.scheme(),
        }
    }

    /// Authenticate a request with this scheme.
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthenticateResult {
        match self {
            Self::JwtBearer(handler) => handler.authenticate(headers),
            Self::Cookie(handler) => handler.authenticate(headers, OffsetDateTime::now_utc()),
        }
    }

    /// Build the challenge response for an unauthenticated request.
    ///
    /// `failure` is the reason a presented credential was rejected, if any.
    #[must_use]
    pub fn challenge(&self, uri: &Uri, failure: Option<&str>) -> Response {
        match self {
            Self::JwtBearer(handler) => handler.challenge(failure),
            Self::Cookie(handler) => handler.challenge(uri),
        }
    }
}

/// Collects scheme registrations.
///
/// # Invariants
/// - Each scheme name is registered at most once.
/// - The last default scheme set wins.
#[derive(Debug)]
pub struct AuthenticationBuilder {
    default_scheme: String,
    handlers: HashMap<String, AuthenticationHandler>,
}

impl AuthenticationBuilder {
    #[must_use]
    pub fn new(default_scheme: &str) -> Self {
        Self {
            default_scheme: default_scheme.to_string(),
            handlers: HashMap::new(),
        }
    }

    /// Replace the default scheme.
    #[must_use]
    pub fn set_default_scheme(mut self, scheme: &str) -> Self {
        self.default_scheme = scheme.to_string();
        self
    }

    /// Register a bearer-token scheme.
    ///
    /// # Errors
    /// Returns `AuthError::DuplicateScheme` if the name is taken.
    pub fn add_jwt_bearer(self, scheme: &str, options: JwtBearerOptions) -> Result<Self, AuthError> {
        if !options.require_https_metadata {
            tracing::warn!(
                scheme,
                "require_https_metadata is disabled: authority metadata is accepted over plain HTTP"
            );
        }
        let handler = JwtBearerHandler::new(scheme.to_string(), options);
        self.add(scheme, AuthenticationHandler::JwtBearer(handler))
    }

    /// Register a cookie scheme signing its tickets with `key`.
    ///
    /// # Errors
    /// Returns `AuthError::DuplicateScheme` if the name is taken.
    pub fn add_cookie(
        self,
        scheme: &str,
        options: CookieAuthenticationOptions,
        key: Key,
    ) -> Result<Self, AuthError> {
        let handler = CookieHandler::new(scheme.to_string(), options, key);
        self.add(scheme, AuthenticationHandler::Cookie(handler))
    }

    fn add(mut self, scheme: &str, handler: AuthenticationHandler) -> Result<Self, AuthError> {
        if self.handlers.contains_key(scheme) {
            return Err(AuthError::DuplicateScheme(scheme.to_string()));
        }
        tracing::debug!(scheme, "registered authentication scheme");
        self.handlers.insert(scheme.to_string(), handler);
        Ok(self)
    }

    /// Finish registration.
    ///
    /// # Errors
    /// Returns `AuthError::UnknownScheme` if the default scheme is not registered.
    pub fn build(self) -> Result<AuthenticationServices, AuthError> {
        if !self.handlers.contains_key(&self.default_scheme) {
            return Err(AuthError::UnknownScheme(self.default_scheme));
        }
        Ok(AuthenticationServices {
            default_scheme: self.default_scheme,
            handlers: self.handlers,
        })
    }
}

/// Immutable registry of authentication schemes.
#[derive(Debug)]
pub struct AuthenticationServices {
    default_scheme: String,
    handlers: HashMap<String, AuthenticationHandler>,
}

impl AuthenticationServices {
    #[must_use]
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// The handler for `scheme`, or for the default scheme when `None`.
    ///
    /// # Errors
    /// Returns `AuthError::UnknownScheme` if no such scheme is registered.
    pub fn handler(&self, scheme: Option<&str>) -> Result<&AuthenticationHandler, AuthError> {
        let scheme = scheme.unwrap_or(&self.default_scheme);
        self.handlers
            .get(scheme)
            .ok_or_else(|| AuthError::UnknownScheme(scheme.to_string()))
    }

    /// The cookie handler registered as `scheme`, used to sign users in.
    #[must_use]
    pub fn cookie(&self, scheme: &str) -> Option<&CookieHandler> {
        match self.handlers.get(scheme)? {
            AuthenticationHandler::Cookie(handler) => Some(handler),
            AuthenticationHandler::JwtBearer(_) => None,
        }
    }

    /// Registered scheme names, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BEARER_SCHEME, COOKIE_SCHEME, cookie};
    use crate::configuration::Configuration;

    fn configuration() -> Configuration {
        Configuration::from_pairs([("Tokens:Issuer", "X"), ("Tokens:Key", "secret")])
            .expect("configuration")
    }

    fn bearer_options() -> JwtBearerOptions {
        JwtBearerOptions::from_configuration(&configuration()).expect("bearer options")
    }

    fn key() -> Key {
        cookie::signing_key(&configuration()).expect("key")
    }

    #[test]
    fn test_last_default_scheme_wins() {
        let services = AuthenticationBuilder::new(BEARER_SCHEME)
            .add_jwt_bearer(BEARER_SCHEME, bearer_options())
            .expect("bearer")
            .set_default_scheme(COOKIE_SCHEME)
            .add_cookie(COOKIE_SCHEME, CookieAuthenticationOptions::api_session(), key())
            .expect("cookie")
            .build()
            .expect("services");

        assert_eq!(services.default_scheme(), COOKIE_SCHEME);
        assert_eq!(services.schemes(), vec![BEARER_SCHEME, COOKIE_SCHEME]);
        assert_eq!(
            services.handler(None).map(AuthenticationHandler::scheme),
            Ok(COOKIE_SCHEME)
        );
        assert_eq!(
            services.handler(Some(BEARER_SCHEME)).map(AuthenticationHandler::scheme),
            Ok(BEARER_SCHEME)
        );
    }

    #[test]
    fn test_duplicate_scheme_is_rejected() {
        let result = AuthenticationBuilder::new(BEARER_SCHEME)
            .add_jwt_bearer(BEARER_SCHEME, bearer_options())
            .and_then(|builder| builder.add_jwt_bearer(BEARER_SCHEME, bearer_options()));

        assert!(matches!(
            result,
            Err(AuthError::DuplicateScheme(name)) if name == BEARER_SCHEME
        ));
    }

    #[test]
    fn test_unregistered_default_scheme_is_rejected() {
        let result = AuthenticationBuilder::new(COOKIE_SCHEME)
            .add_jwt_bearer(BEARER_SCHEME, bearer_options())
            .and_then(AuthenticationBuilder::build);

        assert!(matches!(
            result,
            Err(AuthError::UnknownScheme(name)) if name == COOKIE_SCHEME
        ));
    }

    #[test]
    fn test_unknown_scheme_lookup() {
        let services = AuthenticationBuilder::new(BEARER_SCHEME)
            .add_jwt_bearer(BEARER_SCHEME, bearer_options())
            .and_then(AuthenticationBuilder::build)
            .expect("services");

        assert!(matches!(
            services.handler(Some("Basic")),
            Err(AuthError::UnknownScheme(_))
        ));
        assert!(services.cookie(BEARER_SCHEME).is_none());
        assert!(services.cookie(COOKIE_SCHEME).is_none());
    }
}
