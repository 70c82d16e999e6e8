//! Host configuration module.
//!
//! This module provides the settings the host process needs before the
//! application is composed: which environment it runs in and which ports it
//! serves.
//!
//! # Environment Variables
//!
//! - `WEBAPP_ENVIRONMENT`: Hosting environment name (default: `Production`)
//! - `WEBAPP_LISTEN_PORT`: Port to listen on (default: `5000`)
//! - `WEBAPP_HTTPS_PORT`: Port HTTPS redirects point at (default: `443`)
//!
//! # Invariants
//!
//! - `listen_port` and `https_port` are always valid port numbers (1-65535)
//! - `environment` is never empty

/// Hosting environment the process runs in.
///
/// Selects environment-dependent pipeline stages, most notably whether
/// exception detail is exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEnvironment {
    Development,
    Staging,
    Production,
    /// Any other environment name.
    Custom(String),
}

impl HostEnvironment {
    /// Parse an environment name. Well-known names match case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("Development") {
            Self::Development
        } else if name.eq_ignore_ascii_case("Staging") {
            Self::Staging
        } else if name.eq_ignore_ascii_case("Production") {
            Self::Production
        } else {
            Self::Custom(name.to_string())
        }
    }

    /// Whether this is a development environment.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// The environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Development => "Development",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Host configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()`:
/// - `listen_port` and `https_port` are in the valid range (1-65535)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hosting environment.
    pub environment: HostEnvironment,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Port plain-HTTP requests are redirected to.
    pub https_port: u16,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 5000;
    /// Default port HTTPS redirects target.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default hosting environment name.
    pub const DEFAULT_ENVIRONMENT: &'static str = "Production";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a port variable is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a port variable is set but not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("WEBAPP_ENVIRONMENT")
            .filter(|name| !name.is_empty())
            .map_or(HostEnvironment::Production, |name| {
                HostEnvironment::parse(&name)
            });
        let listen_port = load_port(&lookup, "WEBAPP_LISTEN_PORT", Self::DEFAULT_PORT)?;
        let https_port = load_port(&lookup, "WEBAPP_HTTPS_PORT", Self::DEFAULT_HTTPS_PORT)?;

        Ok(Self {
            environment,
            listen_port,
            https_port,
        })
    }
}

/// Load a port number, returning the default if not set.
///
/// # Errors
///
/// Returns an error if the value is set but not a valid port number.
fn load_port<F>(lookup: &F, name: &str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid port number (must be 1-65535)"),
        }),
    }
}
