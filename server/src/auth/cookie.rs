//! Cookie session authentication scheme.
//!
//! A signed-in session is an [`AuthenticationTicket`] (subject and absolute
//! expiry) stored in a signed cookie. The signature is handled by
//! [`SignedCookieJar`]; the ticket expiry is checked on every request in
//! addition to the cookie's own `Expires` attribute.
//!
//! # Invariants
//! - A ticket is never accepted after its expiry.
//! - A cookie whose signature does not verify is treated as a failed
//!   authentication, not as an anonymous request.

use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use rand::RngCore;
use time::{Duration, OffsetDateTime};

use super::{AuthError, AuthenticateResult, AuthenticatedUser};
use crate::configuration::Configuration;
use crate::logging::templates;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = ".AspNetCore.Cookies";
/// Default login page for browser redirects.
pub const DEFAULT_LOGIN_PATH: &str = "/Account/Login";
/// Query parameter carrying the original URL on a login redirect.
pub const RETURN_URL_PARAMETER: &str = "ReturnUrl";
/// Configuration key holding an optional cookie signing key (at least 64 bytes).
pub const COOKIE_KEY_KEY: &str = "Cookies:Key";

/// Length in bytes of a generated signing key.
const GENERATED_KEY_LENGTH: usize = 64;

/// What an unauthenticated request to a cookie-protected route receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedAction {
    /// `302 Found` to the login page with the original URL as `ReturnUrl`.
    RedirectToLogin { login_path: String },
    /// The given status with an empty body and no `Location` header.
    Status(StatusCode),
}

/// Options of the cookie scheme.
#[derive(Debug, Clone)]
pub struct CookieAuthenticationOptions {
    pub cookie_name: String,
    pub path: String,
    /// Lifetime of a session from sign-in.
    pub expire_time_span: Duration,
    /// Hide the cookie from scripts.
    pub http_only: bool,
    /// Issue the cookie even when the user has not consented to cookies.
    pub is_essential: bool,
    pub same_site: SameSite,
    pub on_unauthenticated: UnauthenticatedAction,
}

impl Default for CookieAuthenticationOptions {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            expire_time_span: Duration::days(14),
            http_only: true,
            is_essential: false,
            same_site: SameSite::Lax,
            on_unauthenticated: UnauthenticatedAction::RedirectToLogin {
                login_path: DEFAULT_LOGIN_PATH.to_string(),
            },
        }
    }
}

impl CookieAuthenticationOptions {
    /// Sessions for API callers: eight hour lifetime, HTTP-only, essential,
    /// and `401 Unauthorized` instead of a login redirect.
    #[must_use]
    pub fn api_session() -> Self {
        Self {
            expire_time_span: Duration::hours(8),
            http_only: true,
            is_essential: true,
            on_unauthenticated: UnauthenticatedAction::Status(StatusCode::UNAUTHORIZED),
            ..Self::default()
        }
    }
}

/// The signing key configured under `Cookies:Key`, or a fresh random key.
///
/// A generated key lives as long as the process; sessions do not survive a
/// restart.
///
/// # Errors
/// Returns `AuthError::InvalidCookieKey` if the configured key is too short.
pub fn signing_key(configuration: &Configuration) -> Result<Key, AuthError> {
    match configuration.get(COOKIE_KEY_KEY).filter(|key| !key.is_empty()) {
        Some(configured) => Key::try_from(configured.as_bytes())
            .map_err(|e| AuthError::InvalidCookieKey(e.to_string())),
        None => {
            let mut bytes = [0u8; GENERATED_KEY_LENGTH];
            rand::rng().fill_bytes(&mut bytes);
            Ok(Key::from(&bytes[..]))
        }
    }
}

/// Identity and expiry stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationTicket {
    pub subject: String,
    pub expires_at: OffsetDateTime,
}

impl AuthenticationTicket {
    fn encode(&self) -> String {
        format!("{}|{}", self.expires_at.unix_timestamp(), self.subject)
    }

    fn decode(value: &str) -> Option<Self> {
        let (expires_at, subject) = value.split_once('|')?;
        let expires_at = OffsetDateTime::from_unix_timestamp(expires_at.parse().ok()?).ok()?;
        Some(Self {
            subject: subject.to_string(),
            expires_at,
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Handler of a registered cookie scheme.
#[derive(Clone)]
pub struct CookieHandler {
    scheme: String,
    options: CookieAuthenticationOptions,
    key: Key,
}

impl std::fmt::Debug for CookieHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieHandler")
            .field("scheme", &self.scheme)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CookieHandler {
    #[must_use]
    pub const fn new(scheme: String, options: CookieAuthenticationOptions, key: Key) -> Self {
        Self {
            scheme,
            options,
            key,
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub const fn options(&self) -> &CookieAuthenticationOptions {
        &self.options
    }

    /// An empty jar signed with this scheme's key.
    #[must_use]
    pub fn jar(&self) -> SignedCookieJar {
        SignedCookieJar::new(self.key.clone())
    }

    /// Add a session cookie for `subject` to the jar.
    ///
    /// A non-essential cookie is only issued when `consent_granted` is set.
    #[must_use]
    pub fn sign_in(
        &self,
        jar: SignedCookieJar,
        subject: &str,
        now: OffsetDateTime,
        consent_granted: bool,
    ) -> SignedCookieJar {
        if !self.options.is_essential && !consent_granted {
            tracing::debug!(
                scheme = %self.scheme,
                "cookie consent not granted; session cookie not issued"
            );
            return jar;
        }

        let ticket = AuthenticationTicket {
            subject: subject.to_string(),
            expires_at: now
                .checked_add(self.options.expire_time_span)
                .unwrap_or(now),
        };
        let cookie = Cookie::build((self.options.cookie_name.clone(), ticket.encode()))
            .path(self.options.path.clone())
            .http_only(self.options.http_only)
            .same_site(self.options.same_site)
            .expires(ticket.expires_at)
            .build();

        tracing::info!(authentication_scheme = %self.scheme, "{}", templates::SIGNED_IN);
        jar.add(cookie)
    }

    /// Remove the session cookie.
    #[must_use]
    pub fn sign_out(&self, jar: SignedCookieJar) -> SignedCookieJar {
        tracing::info!(authentication_scheme = %self.scheme, "{}", templates::SIGNED_OUT);
        jar.remove(
            Cookie::build((self.options.cookie_name.clone(), ""))
                .path(self.options.path.clone()),
        )
    }

    /// Authenticate the request from its cookies.
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap, now: OffsetDateTime) -> AuthenticateResult {
        let name = self.options.cookie_name.as_str();
        let signed = SignedCookieJar::from_headers(headers, self.key.clone());

        let Some(cookie) = signed.get(name) else {
            if CookieJar::from_headers(headers).get(name).is_some() {
                return AuthenticateResult::Fail("unprotect ticket failed".to_string());
            }
            return AuthenticateResult::NoResult;
        };
        let Some(ticket) = AuthenticationTicket::decode(cookie.value()) else {
            return AuthenticateResult::Fail("malformed ticket".to_string());
        };
        if ticket.is_expired(now) {
            return AuthenticateResult::Fail("ticket expired".to_string());
        }

        AuthenticateResult::Success(AuthenticatedUser {
            scheme: self.scheme.clone(),
            subject: Some(ticket.subject),
            token: None,
        })
    }

    /// Respond to an unauthenticated request for `uri`.
    #[must_use]
    pub fn challenge(&self, uri: &Uri) -> Response {
        match &self.options.on_unauthenticated {
            UnauthenticatedAction::Status(status) => {
                tracing::info!(status_code = status.as_u16(), "{}", templates::STATUS_CODE_RESULT);
                (*status).into_response()
            }
            UnauthenticatedAction::RedirectToLogin { login_path } => {
                let return_url = uri
                    .path_and_query()
                    .map_or_else(|| uri.path(), |path_and_query| path_and_query.as_str());
                let location = format!(
                    "{login_path}?{RETURN_URL_PARAMETER}={}",
                    urlencoding::encode(return_url)
                );
                (StatusCode::FOUND, [(LOCATION, location)]).into_response()
            }
        }
    }
}
