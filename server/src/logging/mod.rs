//! Logging facility.
//!
//! Builds the process logger from a [`LoggerConfiguration`]:
//!
//! - events below the minimum level (Information by default) are dropped;
//! - events whose template is in the global exclusion rules are dropped
//!   before any sink sees them;
//! - the primary sink writes everything else to stdout;
//! - the secondary sink applies its own trimmed exclusion rules and writes
//!   to stdout or to a file.
//!
//! # Post-conditions
//! - The returned [`Logger`] is immutable. Installing it as the process
//!   default succeeds at most once.

pub mod exclusion;
pub mod filter;
pub mod templates;

use std::path::{Path, PathBuf};

use tracing::{Dispatch, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use crate::configuration::Configuration;

pub use exclusion::{ExclusionRules, MatchMode};
pub use filter::ExclusionFilter;

/// Configuration key overriding the minimum level.
pub const MINIMUM_LEVEL_KEY: &str = "Logging:MinimumLevel";
/// Configuration key selecting a file for the secondary sink.
pub const SECONDARY_SINK_PATH_KEY: &str = "Logging:SecondarySink:Path";

/// Error returned when the logger cannot be built or installed.
#[derive(Debug)]
pub enum LoggingError {
    /// The configured minimum level is not a known level name.
    InvalidMinimumLevel(String),
    /// The file sink could not be opened.
    SinkUnavailable { path: PathBuf, reason: String },
    /// A process-wide logger is already installed.
    AlreadyInstalled,
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMinimumLevel(name) => write!(f, "unknown minimum log level: {name}"),
            Self::SinkUnavailable { path, reason } => {
                write!(f, "cannot open log sink {}: {reason}", path.display())
            }
            Self::AlreadyInstalled => write!(f, "a process-wide logger is already installed"),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Parse a severity name.
///
/// Accepts `Verbose`, `Debug`, `Information`, `Warning`, `Error` and `Fatal`
/// (case-insensitive). `Fatal` maps to the error level.
pub fn parse_level(name: &str) -> Result<Level, LoggingError> {
    let level = match name.trim().to_ascii_lowercase().as_str() {
        "verbose" | "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "information" | "info" => Level::INFO,
        "warning" | "warn" => Level::WARN,
        "error" | "fatal" => Level::ERROR,
        _ => return Err(LoggingError::InvalidMinimumLevel(name.to_string())),
    };
    Ok(level)
}

/// Where the secondary sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Console,
    /// Append to a single file that is never rotated.
    File(PathBuf),
}

impl SinkTarget {
    /// Open the target.
    pub fn open(&self) -> Result<SinkWriter, LoggingError> {
        match self {
            Self::Console => Ok(SinkWriter::new(std::io::stdout, true)),
            Self::File(path) => open_file_sink(path).map(|appender| SinkWriter::new(appender, false)),
        }
    }
}

fn open_file_sink(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let unavailable = |reason: String| LoggingError::SinkUnavailable {
        path: path.to_path_buf(),
        reason,
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| unavailable("path has no file name".to_string()))?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| unavailable(e.to_string()))
}

/// A sink's writer and whether it may receive ANSI colour codes.
pub struct SinkWriter {
    writer: BoxMakeWriter,
    ansi: bool,
}

impl SinkWriter {
    #[must_use]
    pub fn new<M>(make_writer: M, ansi: bool) -> Self
    where
        M: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self {
            writer: BoxMakeWriter::new(make_writer),
            ansi,
        }
    }
}

/// Settings the logger is built from.
#[derive(Debug, Clone)]
pub struct LoggerConfiguration {
    /// Events below this level are dropped before filtering.
    pub minimum_level: Level,
    /// Applied before every sink.
    pub global_exclusions: ExclusionRules,
    /// Applied to the secondary sink only.
    pub secondary_exclusions: ExclusionRules,
    /// Destination of the secondary sink.
    pub secondary_sink: SinkTarget,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            minimum_level: Level::INFO,
            global_exclusions: ExclusionRules::request_noise(),
            secondary_exclusions: ExclusionRules::secondary_sink_noise(),
            secondary_sink: SinkTarget::Console,
        }
    }
}

impl LoggerConfiguration {
    /// Default configuration with overrides from the configuration source.
    ///
    /// # Errors
    /// Returns `LoggingError::InvalidMinimumLevel` for an unknown level name.
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, LoggingError> {
        let mut logger_configuration = Self::default();
        if let Some(name) = configuration.get(MINIMUM_LEVEL_KEY) {
            logger_configuration.minimum_level = parse_level(&name)?;
        }
        if let Some(path) = configuration.get(SECONDARY_SINK_PATH_KEY).filter(|p| !p.is_empty()) {
            logger_configuration.secondary_sink = SinkTarget::File(PathBuf::from(path));
        }
        Ok(logger_configuration)
    }

    /// Build the logger writing to stdout and the configured secondary sink.
    ///
    /// # Errors
    /// Returns `LoggingError::SinkUnavailable` if the file sink cannot be opened.
    pub fn create_logger(&self) -> Result<Logger, LoggingError> {
        let secondary = self.secondary_sink.open()?;
        Ok(self.create_logger_with_writers(SinkWriter::new(std::io::stdout, true), secondary))
    }

    /// Build the logger over explicit sink writers.
    #[must_use]
    pub fn create_logger_with_writers(&self, primary: SinkWriter, secondary: SinkWriter) -> Logger {
        let primary_filter =
            ExclusionFilter::new(self.minimum_level, vec![self.global_exclusions.clone()]);
        let secondary_filter = ExclusionFilter::new(
            self.minimum_level,
            vec![
                self.global_exclusions.clone(),
                self.secondary_exclusions.clone(),
            ],
        );

        let primary_layer = tracing_subscriber::fmt::layer()
            .with_writer(primary.writer)
            .with_ansi(primary.ansi)
            .with_filter(primary_filter);
        let secondary_layer = tracing_subscriber::fmt::layer()
            .with_writer(secondary.writer)
            .with_ansi(secondary.ansi)
            .with_filter(secondary_filter);

        let subscriber = tracing_subscriber::registry()
            .with(primary_layer)
            .with(secondary_layer);

        Logger {
            dispatch: Dispatch::new(subscriber),
        }
    }
}

/// Handle to a constructed logger.
///
/// Created once during bootstrap and passed to whoever needs it. Cloning is
/// cheap and shares the same sinks.
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Make this logger the process-wide default.
    ///
    /// # Errors
    /// Returns `LoggingError::AlreadyInstalled` if a default was already set.
    pub fn install(&self) -> Result<(), LoggingError> {
        #[allow(clippy::disallowed_methods)] // Dispatch clone shares the subscriber
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LoggingError::AlreadyInstalled)
    }

    /// Run `f` with this logger as the current thread's default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CapturedLogs;

    fn capture(configuration: &LoggerConfiguration) -> (Logger, CapturedLogs, CapturedLogs) {
        let primary = CapturedLogs::default();
        let secondary = CapturedLogs::default();
        let logger = configuration
            .create_logger_with_writers(primary.sink_writer(), secondary.sink_writer());
        (logger, primary, secondary)
    }

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("Verbose").expect("level"), Level::TRACE);
        assert_eq!(parse_level("debug").expect("level"), Level::DEBUG);
        assert_eq!(parse_level("Information").expect("level"), Level::INFO);
        assert_eq!(parse_level("WARNING").expect("level"), Level::WARN);
        assert_eq!(parse_level("Error").expect("level"), Level::ERROR);
        assert_eq!(parse_level("Fatal").expect("level"), Level::ERROR);
        assert!(matches!(
            parse_level("Loud"),
            Err(LoggingError::InvalidMinimumLevel(name)) if name == "Loud"
        ));
    }

    #[test]
    fn test_default_configuration() {
        let configuration = LoggerConfiguration::default();

        assert_eq!(configuration.minimum_level, Level::INFO);
        assert_eq!(configuration.secondary_sink, SinkTarget::Console);
        assert_eq!(configuration.global_exclusions.mode(), MatchMode::Exact);
        assert_eq!(configuration.secondary_exclusions.mode(), MatchMode::Trimmed);
    }

    #[test]
    fn test_from_configuration_overrides() {
        let source = Configuration::from_pairs([
            ("Logging:MinimumLevel", "Warning"),
            ("Logging:SecondarySink:Path", "/var/log/webapp/secondary.log"),
        ])
        .expect("configuration");
        let configuration = LoggerConfiguration::from_configuration(&source).expect("valid");

        assert_eq!(configuration.minimum_level, Level::WARN);
        assert_eq!(
            configuration.secondary_sink,
            SinkTarget::File(PathBuf::from("/var/log/webapp/secondary.log"))
        );
    }

    #[test]
    fn test_from_configuration_rejects_unknown_level() {
        let source = Configuration::from_pairs([("Logging:MinimumLevel", "chatty")]).expect("configuration");
        assert!(LoggerConfiguration::from_configuration(&source).is_err());
    }

    #[test]
    fn test_global_exclusions_reach_neither_sink() {
        let (logger, primary, secondary) = capture(&LoggerConfiguration::default());

        logger.in_scope(|| {
            for template in exclusion::REQUEST_NOISE {
                tracing::info!("{}", template);
            }
            tracing::info!("kept message");
        });

        for template in exclusion::REQUEST_NOISE {
            assert!(!primary.contents().contains(template));
            assert!(!secondary.contents().contains(template));
        }
        assert!(primary.contents().contains("kept message"));
        assert!(secondary.contents().contains("kept message"));
    }

    #[test]
    fn test_secondary_exclusions_only_affect_secondary_sink() {
        let (logger, primary, secondary) = capture(&LoggerConfiguration::default());

        logger.in_scope(|| {
            tracing::info!("{}", "Starting Hangfire Server");
            tracing::info!("{}", "   Worker count: 20   ");
        });

        assert!(primary.contents().contains("Starting Hangfire Server"));
        assert!(primary.contents().contains("Worker count: 20"));
        assert!(!secondary.contents().contains("Starting Hangfire Server"));
        assert!(!secondary.contents().contains("Worker count: 20"));
    }

    #[test]
    fn test_events_below_information_are_dropped() {
        let (logger, primary, secondary) = capture(&LoggerConfiguration::default());

        logger.in_scope(|| {
            tracing::debug!("debug detail");
            tracing::trace!("trace detail");
            tracing::warn!("warning detail");
        });

        for sink in [&primary, &secondary] {
            let contents = sink.contents();
            assert!(!contents.contains("debug detail"));
            assert!(!contents.contains("trace detail"));
            assert!(contents.contains("warning detail"));
        }
    }

    #[test]
    fn test_file_sink_receives_secondary_output() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("secondary.log");
        let configuration = LoggerConfiguration {
            secondary_sink: SinkTarget::File(path),
            ..LoggerConfiguration::default()
        };
        let primary = CapturedLogs::default();
        let secondary = configuration.secondary_sink.open().expect("file sink opens");
        let logger = configuration.create_logger_with_writers(primary.sink_writer(), secondary);

        logger.in_scope(|| {
            tracing::info!("persisted message");
            tracing::info!("{}", "Listening queues: 'default'");
        });

        let written: String = std::fs::read_dir(directory.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| std::fs::read_to_string(entry.path()).unwrap_or_default())
            .collect();
        assert!(written.contains("persisted message"));
        assert!(!written.contains("Listening queues"));
    }

    #[test]
    fn test_file_sink_without_file_name_is_unavailable() {
        let result = SinkTarget::File(PathBuf::from("/")).open();
        assert!(matches!(result, Err(LoggingError::SinkUnavailable { .. })));
    }

    #[test]
    fn test_install_succeeds_at_most_once() {
        let (logger, _primary, _secondary) = capture(&LoggerConfiguration::default());

        let _ = logger.install();
        assert!(matches!(logger.install(), Err(LoggingError::AlreadyInstalled)));
    }

    #[test]
    fn test_logging_error_display() {
        assert_eq!(
            LoggingError::InvalidMinimumLevel("Loud".to_string()).to_string(),
            "unknown minimum log level: Loud"
        );
        assert_eq!(
            LoggingError::AlreadyInstalled.to_string(),
            "a process-wide logger is already installed"
        );
    }
}
