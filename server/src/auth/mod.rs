//! Authentication module.
//!
//! Two schemes are registered side by side: a stateless bearer-token scheme
//! and a cookie session scheme. Which one guards a route is decided per
//! route with an [`AuthorizationPolicy`].
//!
//! # Pre-conditions
//! - `Tokens:Key` must be configured for the bearer scheme.
//!
//! # Post-conditions
//! - The scheme registry is immutable once built.
//!
//! # Invariants
//! - Scheme names are unique within a registry.
//! - The default scheme is always registered.

pub mod bearer;
pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod registry;

pub use bearer::{JwtBearerHandler, JwtBearerOptions};
pub use cookie::{AuthenticationTicket, CookieAuthenticationOptions, CookieHandler, UnauthenticatedAction};
pub use jwt::{JwtError, TokenValidationParameters};
pub use middleware::{AuthorizationPolicy, authorize};
pub use registry::{AuthenticationBuilder, AuthenticationHandler, AuthenticationServices};

use crate::configuration::ConfigurationError;

/// Name of the bearer-token scheme.
pub const BEARER_SCHEME: &str = "Bearer";
/// Name of the cookie scheme.
pub const COOKIE_SCHEME: &str = "Cookies";

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Scheme that authenticated the request.
    pub scheme: String,
    /// Subject identifier, if the credential carried one.
    pub subject: Option<String>,
    /// The raw bearer token, kept when the scheme saves tokens.
    pub token: Option<String>,
}

impl AuthenticatedUser {
    /// Name used in log messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.subject.as_deref().unwrap_or("(anonymous)")
    }
}

/// Outcome of running a scheme's authentication against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateResult {
    Success(AuthenticatedUser),
    /// No credential for this scheme was presented.
    NoResult,
    /// A credential was presented and rejected.
    Fail(String),
}

/// Error returned when authentication cannot be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A scheme with this name is already registered.
    DuplicateScheme(String),
    /// No scheme with this name is registered.
    UnknownScheme(String),
    /// A required configuration value is missing.
    Configuration(ConfigurationError),
    /// The cookie signing key is unusable.
    InvalidCookieKey(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateScheme(name) => write!(f, "scheme already exists: {name}"),
            Self::UnknownScheme(name) => write!(f, "no authentication scheme registered: {name}"),
            Self::Configuration(e) => write!(f, "authentication configuration error: {e}"),
            Self::InvalidCookieKey(reason) => write!(f, "invalid cookie key: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::DuplicateScheme(_) | Self::UnknownScheme(_) | Self::InvalidCookieKey(_) => None,
        }
    }
}

impl From<ConfigurationError> for AuthError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}
