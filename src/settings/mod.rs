//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables
//! prefixed with `PRIVCOMPUTE_`, using `__` to separate sections, e.g.
//! `PRIVCOMPUTE_LIFECYCLE__MAX_TIMEOUT=60`. An example configuration file can be found in
//! the `configs/` directory located in the repository root.

use std::{fmt, path::Path, time::Duration};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{aggregation::DEFAULT_FLOAT_PRECISION, lifecycle::Backoff};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    #[validate]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let builder = Config::builder().add_source(config::File::from(path.as_ref()));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("privcompute")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Deserialize, Clone)]
/// Computation service settings.
pub struct ApiSettings {
    /// The base URL of the computation service API.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [api]
    /// url = "https://node-1.example.org/api"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// PRIVCOMPUTE_API__URL=https://node-1.example.org/api
    /// ```
    pub url: String,
    /// The bearer token sent with every request, if any.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Validate, Deserialize, Clone, Copy, PartialEq)]
#[validate(schema(function = "validate_lifecycle"))]
#[serde(default)]
/// Settings of the polling loop. Missing keys take their default value.
pub struct LifecycleSettings {
    /// How long to wait for a computation, in seconds. This is also the timeout sent to
    /// the server with every computation.
    pub max_timeout: u64,
    /// The first interval between two polls, in milliseconds.
    pub initial_interval: u64,
    /// The maximal interval between two polls, in milliseconds.
    pub max_sleep: u64,
    /// The factor by which the interval grows after each poll.
    pub growth: f64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            max_timeout: 900,
            initial_interval: 100,
            max_sleep: 30_000,
            growth: 1.05,
        }
    }
}

impl LifecycleSettings {
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout)
    }

    /// A fresh backoff starting at the initial interval.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_interval),
            Duration::from_millis(self.max_sleep),
            self.growth,
        )
    }

    /// Checks the polling intervals.
    fn validate_lifecycle(&self) -> Result<(), ValidationError> {
        if self.max_timeout == 0 {
            Err(ValidationError::new("max_timeout must be positive"))
        } else if self.initial_interval == 0 || self.initial_interval > self.max_sleep {
            Err(ValidationError::new(
                "initial_interval must be positive and at most max_sleep",
            ))
        } else if !(self.growth >= 1.) || !self.growth.is_finite() {
            Err(ValidationError::new("growth must be at least 1"))
        } else {
            Ok(())
        }
    }
}

/// A wrapper for validate derive.
fn validate_lifecycle(s: &LifecycleSettings) -> Result<(), ValidationError> {
    s.validate_lifecycle()
}

#[derive(Debug, Deserialize, Clone, Copy)]
/// Settings for shaping results.
pub struct OutputSettings {
    /// Number of decimal places derived values are rounded to.
    pub float_precision: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            float_precision: DEFAULT_FLOAT_PRECISION,
        }
    }
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// PRIVCOMPUTE_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: EnvFilter::new("info"),
        }
    }
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}
