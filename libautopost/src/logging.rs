//! Logging for the daemon
//!
//! All output goes to stderr. The format comes from `--log-format`, then
//! `AUTOPOST_LOG_FORMAT`, then defaults to text. The level comes from
//! `RUST_LOG` when set, otherwise `AUTOPOST_LOG_LEVEL` (default `info`);
//! `--verbose` lowers the fallback to `debug`.
//!
//! ```no_run
//! use libautopost::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "info", false)
//!     .try_init()
//!     .expect("no subscriber installed yet");
//! ```

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

const FORMAT_ENV: &str = "AUTOPOST_LOG_FORMAT";
const LEVEL_ENV: &str = "AUTOPOST_LOG_LEVEL";
const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, no targets; what journald and pipes want
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line output with source locations
    Pretty,
}

impl LogFormat {
    const NAMES: [(&'static str, LogFormat); 3] = [
        ("text", LogFormat::Text),
        ("json", LogFormat::Json),
        ("pretty", LogFormat::Pretty),
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, format)| *format == self)
            .map(|(name, _)| *name)
            .unwrap_or("text")
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::NAMES.iter().map(|(name, _)| *name).collect();
                format!("unknown log format '{}' (expected {})", s, names.join(", "))
            })
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the global subscriber is set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub fallback_filter: String,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: &str, verbose: bool) -> Self {
        let fallback_filter = if verbose { "debug" } else { level };
        Self {
            format,
            fallback_filter: fallback_filter.to_string(),
        }
    }

    /// Resolve from the environment; an explicit `format` wins over
    /// `AUTOPOST_LOG_FORMAT`, and an unparseable value there is ignored
    pub fn from_env(format: Option<LogFormat>, verbose: bool) -> Self {
        let format = format
            .or_else(|| std::env::var(FORMAT_ENV).ok()?.parse().ok())
            .unwrap_or(LogFormat::Text);
        let level = std::env::var(LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());

        Self::new(format, &level, verbose)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.fallback_filter))
    }

    /// Install the global subscriber
    ///
    /// # Errors
    ///
    /// Fails when a global subscriber is already installed.
    pub fn try_init(&self) -> Result<(), ConfigError> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr);

        let installed = match self.format {
            LogFormat::Json => builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .try_init(),
            LogFormat::Pretty => builder
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => builder
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .try_init(),
        };

        installed.map_err(|e| ConfigError::InvalidValue {
            field: "logging".to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_are_case_insensitive() {
        assert_eq!("Text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn test_unknown_format_lists_choices() {
        let err = "syslog".parse::<LogFormat>().unwrap_err();
        assert_eq!(err, "unknown log format 'syslog' (expected text, json, pretty)");
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::new(LogFormat::Text, "warn", true);
        assert_eq!(config.fallback_filter, "debug");

        let config = LoggingConfig::new(LogFormat::Text, "warn", false);
        assert_eq!(config.fallback_filter, "warn");
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_resolution_order() {
        std::env::set_var(FORMAT_ENV, "json");
        std::env::set_var(LEVEL_ENV, "warn");

        let config = LoggingConfig::from_env(Some(LogFormat::Pretty), false);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.fallback_filter, "warn");
        assert_eq!(LoggingConfig::from_env(None, false).format, LogFormat::Json);

        std::env::set_var(FORMAT_ENV, "xml");
        assert_eq!(LoggingConfig::from_env(None, false).format, LogFormat::Text);

        std::env::remove_var(FORMAT_ENV);
        std::env::remove_var(LEVEL_ENV);

        let config = LoggingConfig::from_env(None, false);
        assert_eq!(config, LoggingConfig::new(LogFormat::Text, "info", false));
    }
}
