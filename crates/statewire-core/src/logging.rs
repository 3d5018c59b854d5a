#![forbid(unsafe_code)]

//! Structured logging setup.
//!
//! Re-exports the `tracing` macros and installs a global `tracing-subscriber`
//! `fmt` subscriber. The filter comes from `STATEWIRE_LOG`, then `RUST_LOG`,
//! then the configured default. JSON output requires the `tracing-json`
//! feature; without it a JSON request falls back to pretty output with a
//! warning.

use std::fmt;

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
use tracing_subscriber::EnvFilter;

use crate::env::lookup_first;

/// Environment variables consulted for the log filter, in order.
pub const FILTER_ENV_KEYS: &[&str] = &["STATEWIRE_LOG", "RUST_LOG"];

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one event per line.
    #[default]
    Pretty,
    /// Newline-delimited JSON objects.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive string, e.g. `"info,statewire_runtime=trace"`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Defaults with the filter taken from [`FILTER_ENV_KEYS`] when set.
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = lookup_first(get_env, FILTER_ENV_KEYS) {
            config.filter = filter;
        }
        config
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Errors from [`init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogInitError {
    /// The filter string did not parse.
    InvalidFilter(String),
    /// A global subscriber was already installed.
    AlreadyInitialized,
}

impl fmt::Display for LogInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(msg) => write!(f, "invalid log filter: {msg}"),
            Self::AlreadyInitialized => f.write_str("a global subscriber is already installed"),
        }
    }
}

impl std::error::Error for LogInitError {}

/// Parse the filter directives of `config`.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LogInitError> {
    EnvFilter::try_new(&config.filter).map_err(|e| LogInitError::InvalidFilter(e.to_string()))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for program output.
pub fn init(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match config.format {
        #[cfg(feature = "tracing-json")]
        LogFormat::Json => builder.json().try_init(),
        #[cfg(not(feature = "tracing-json"))]
        LogFormat::Json => {
            let result = builder.try_init();
            warn!("JSON logging requested but the tracing-json feature is disabled");
            result
        }
        LogFormat::Pretty => builder.try_init(),
    };
    result.map_err(|_| LogInitError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn env_filter_precedence() {
        let both = |k: &str| match k {
            "STATEWIRE_LOG" => Some("trace".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        };
        assert_eq!(LogConfig::from_env_with(both).filter, "trace");

        let rust_only = |k: &str| (k == "RUST_LOG").then(|| "info".to_string());
        assert_eq!(LogConfig::from_env_with(rust_only).filter, "info");

        assert_eq!(LogConfig::from_env_with(|_| None), LogConfig::default());
    }

    #[test]
    fn invalid_filter_is_reported() {
        let config = LogConfig::default().with_filter("statewire=notalevel");
        assert!(matches!(
            build_filter(&config),
            Err(LogInitError::InvalidFilter(_))
        ));
        assert!(matches!(init(&config), Err(LogInitError::InvalidFilter(_))));
    }

    #[test]
    fn builder_helpers() {
        let config = LogConfig::default()
            .with_filter("debug")
            .with_format(LogFormat::Json);
        assert_eq!(config.filter, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(build_filter(&config).is_ok());
    }
}
