//! Application composition.
//!
//! `Startup` turns a [`Configuration`] into the shared [`Services`] and then
//! wraps the application routes in the request pipeline.
//!
//! # Pre-conditions
//! - `Tokens:Key` is configured.
//!
//! # Post-conditions
//! - `configure_services` either returns every service or fails before any
//!   is usable.
//! - The default authentication scheme is the cookie scheme.

use std::sync::Arc;

use axum::Router;

use crate::auth::{
    AuthError, AuthenticationBuilder, AuthenticationServices, BEARER_SCHEME, COOKIE_SCHEME,
    CookieAuthenticationOptions, JwtBearerOptions, cookie,
};
use crate::config::HostEnvironment;
use crate::configuration::{Configuration, ConfigurationError};
use crate::logging::{Logger, LoggerConfiguration, LoggingError, SinkWriter};
use crate::pipeline::{
    HttpsRedirectionOptions, PipelineOptions, RequestPipeline, ResponseCompressionOptions,
};

/// Error returned when the application cannot be composed.
#[derive(Debug)]
pub enum StartupError {
    Logging(LoggingError),
    Authentication(AuthError),
    Configuration(ConfigurationError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(e) => write!(f, "logging: {e}"),
            Self::Authentication(e) => write!(f, "authentication: {e}"),
            Self::Configuration(e) => write!(f, "configuration: {e}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<LoggingError> for StartupError {
    fn from(e: LoggingError) -> Self {
        Self::Logging(e)
    }
}

impl From<AuthError> for StartupError {
    fn from(e: AuthError) -> Self {
        Self::Authentication(e)
    }
}

impl From<ConfigurationError> for StartupError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

/// Services shared by every request.
#[derive(Debug, Clone)]
pub struct Services {
    pub logger: Logger,
    pub authentication: Arc<AuthenticationServices>,
    pub compression: ResponseCompressionOptions,
}

/// Composition root.
pub struct Startup {
    configuration: Configuration,
    log_writers: Option<(SinkWriter, SinkWriter)>,
}

impl Startup {
    #[must_use]
    pub const fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            log_writers: None,
        }
    }

    /// Send log output to the given writers instead of the configured sinks.
    #[must_use]
    pub fn with_log_writers(mut self, primary: SinkWriter, secondary: SinkWriter) -> Self {
        self.log_writers = Some((primary, secondary));
        self
    }

    /// Build the logger, authentication schemes and compression settings.
    ///
    /// The logger is built first so that scheme registration is logged
    /// through it.
    ///
    /// # Errors
    /// Fails on an invalid logging setting, an unopenable log file, a
    /// missing `Tokens:Key` or an unusable `Cookies:Key`.
    pub fn configure_services(self) -> Result<Services, StartupError> {
        let logger_configuration = LoggerConfiguration::from_configuration(&self.configuration)?;
        let logger = match self.log_writers {
            Some((primary, secondary)) => {
                logger_configuration.create_logger_with_writers(primary, secondary)
            }
            None => logger_configuration.create_logger()?,
        };

        let authentication =
            logger.in_scope(|| register_authentication(&self.configuration))?;

        Ok(Services {
            logger,
            authentication: Arc::new(authentication),
            compression: ResponseCompressionOptions::from_configuration(&self.configuration)?,
        })
    }

    /// Wrap `mvc` in the request pipeline for `environment`.
    ///
    /// `https_port` is where plain-HTTP requests are redirected; `None`
    /// disables redirection.
    #[must_use]
    pub fn configure(
        services: &Services,
        mvc: Router,
        environment: &HostEnvironment,
        https_port: Option<u16>,
    ) -> Router {
        let options = PipelineOptions {
            https_redirection: HttpsRedirectionOptions {
                https_port,
                ..HttpsRedirectionOptions::default()
            },
            compression: services.compression.clone(),
            ..PipelineOptions::default()
        };
        services.logger.in_scope(|| {
            tracing::info!(environment = %environment, "configuring request pipeline");
            RequestPipeline::for_environment(environment, options).build(mvc)
        })
    }
}

/// Register the bearer scheme, then the cookie scheme, which becomes the
/// default.
fn register_authentication(
    configuration: &Configuration,
) -> Result<AuthenticationServices, StartupError> {
    let bearer = JwtBearerOptions::from_configuration(configuration)?;
    let cookie_key = cookie::signing_key(configuration)?;

    let services = AuthenticationBuilder::new(BEARER_SCHEME)
        .add_jwt_bearer(BEARER_SCHEME, bearer)?
        .set_default_scheme(COOKIE_SCHEME)
        .add_cookie(
            COOKIE_SCHEME,
            CookieAuthenticationOptions::api_session(),
            cookie_key,
        )?
        .build()?;

    tracing::info!(
        default_scheme = services.default_scheme(),
        schemes = ?services.schemes(),
        "authentication configured"
    );
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CapturedLogs;

    fn startup(pairs: &[(&str, &str)]) -> (Startup, CapturedLogs) {
        let logs = CapturedLogs::default();
        let startup = Startup::new(Configuration::from_pairs(pairs.iter().copied()).expect("configuration"))
            .with_log_writers(logs.sink_writer(), CapturedLogs::default().sink_writer());
        (startup, logs)
    }

    #[test]
    fn test_services_default_to_cookie_scheme() {
        let (startup, logs) = startup(&[("Tokens:Issuer", "X"), ("Tokens:Key", "secret")]);

        let services = startup.configure_services().expect("services");

        assert_eq!(services.authentication.default_scheme(), COOKIE_SCHEME);
        assert_eq!(
            services.authentication.schemes(),
            vec![BEARER_SCHEME, COOKIE_SCHEME]
        );
        assert!(logs.contents().contains("authentication configured"));
    }

    #[test]
    fn test_missing_signing_key_fails() {
        let (startup, _logs) = startup(&[("Tokens:Issuer", "X")]);

        let result = startup.configure_services();

        assert!(matches!(
            result,
            Err(StartupError::Authentication(AuthError::Configuration(
                ConfigurationError::MissingKey(key)
            ))) if key == "Tokens:Key"
        ));
    }

    #[test]
    fn test_invalid_minimum_level_fails() {
        let (startup, _logs) = startup(&[
            ("Tokens:Issuer", "X"),
            ("Tokens:Key", "secret"),
            ("Logging:MinimumLevel", "loud"),
        ]);

        assert!(matches!(
            startup.configure_services(),
            Err(StartupError::Logging(LoggingError::InvalidMinimumLevel(_)))
        ));
    }

    #[test]
    fn test_short_cookie_key_fails() {
        let (startup, _logs) = startup(&[
            ("Tokens:Issuer", "X"),
            ("Tokens:Key", "secret"),
            ("Cookies:Key", "too-short"),
        ]);

        assert!(matches!(
            startup.configure_services(),
            Err(StartupError::Authentication(AuthError::InvalidCookieKey(_)))
        ));
    }

    #[test]
    fn test_invalid_compression_setting_fails() {
        let (startup, _logs) = startup(&[
            ("Tokens:Issuer", "X"),
            ("Tokens:Key", "secret"),
            ("ResponseCompression:EnableForHttps", "sometimes"),
        ]);

        assert!(matches!(
            startup.configure_services(),
            Err(StartupError::Configuration(ConfigurationError::InvalidValue { .. }))
        ));
    }
}
