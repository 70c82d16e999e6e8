//! Key-value configuration source.
//!
//! Application settings such as `Tokens:Issuer` and `Tokens:Key` are read
//! through this type. Keys are hierarchical, with `:` separating sections.
//!
//! # Sources
//!
//! - Process environment: `__` in a variable name maps to `:`, so
//!   `Tokens__Issuer=...` provides `Tokens:Issuer`.
//! - In-memory pairs, used by tests and embedding hosts.
//!
//! # Invariants
//!
//! - Lookups are case-insensitive.
//! - The source is read-only once constructed.

use config::{Config, ConfigError, Environment, Map};

/// Separator between configuration sections.
pub const KEY_DELIMITER: &str = ":";

/// Separator used in environment variable names in place of `:`.
const ENV_KEY_DELIMITER: &str = "__";

/// Error returned when a required configuration key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The key is not present in any source.
    MissingKey(String),
    /// The key is present but has an empty value.
    EmptyValue(String),
    /// The key is present but its value has the wrong type.
    InvalidValue { key: String, reason: String },
    /// The sources could not be merged.
    Source(String),
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey(key) => write!(f, "missing configuration key: {key}"),
            Self::EmptyValue(key) => write!(f, "configuration key {key} must not be empty"),
            Self::InvalidValue { key, reason } => {
                write!(f, "invalid value for configuration key {key}: {reason}")
            }
            Self::Source(reason) => write!(f, "failed to build configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Read-only, string-keyed configuration lookups.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    source: Config,
}

impl Configuration {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_env_vars(std::env::vars())
    }

    /// Build configuration from environment-style `(name, value)` pairs.
    ///
    /// `__` in a name is treated as the section separator.
    pub fn from_env_vars<I>(vars: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::build(ENV_KEY_DELIMITER, vars)
    }

    /// Build configuration from `:`-delimited key/value pairs.
    ///
    /// Later pairs override earlier ones with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::build(
            KEY_DELIMITER,
            pairs
                .into_iter()
                .map(|(key, value)| (key.as_ref().to_string(), value.into())),
        )
    }

    fn build<I>(separator: &str, entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries: Map<String, String> = entries
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        let source = Config::builder()
            .add_source(
                Environment::default()
                    .separator(separator)
                    .source(Some(entries)),
            )
            .build()
            .map_err(|e| ConfigurationError::Source(e.to_string()))?;
        Ok(Self { source })
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.source.get_string(&value_path(key)).ok()
    }

    /// Look up a boolean key. `true`/`false`, `yes`/`no`, `on`/`off` and
    /// `1`/`0` are accepted.
    ///
    /// # Errors
    /// Returns `ConfigurationError::InvalidValue` if the value is not a boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigurationError> {
        match self.source.get_bool(&value_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(ConfigurationError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Look up a key that must be present and non-empty.
    pub fn required(&self, key: &str) -> Result<String, ConfigurationError> {
        match self.get(key) {
            None => Err(ConfigurationError::MissingKey(key.to_string())),
            Some(value) if value.is_empty() => Err(ConfigurationError::EmptyValue(key.to_string())),
            Some(value) => Ok(value),
        }
    }
}

/// The lowercased, `.`-delimited path of a `:`-delimited key.
fn value_path(key: &str) -> String {
    key.replace(KEY_DELIMITER, ".").to_ascii_lowercase()
}
