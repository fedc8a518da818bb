//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when neither settings nor `RUST_LOG` provide one.
pub const DEFAULT_FILTER: &str = "recordstore=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolves settings, letting `RUST_LOG` override the configured level.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let directive = std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| settings.level.clone())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            filter: EnvFilter::try_new(&directive)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
            format: settings
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or_default(),
            file: settings.file.clone(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("other"), LogFormat::Pretty);
    }

    #[test]
    fn test_from_settings_format_and_file() {
        let settings = LoggingSettings {
            level: Some("recordstore=debug".to_string()),
            format: Some("json".to_string()),
            file: Some(PathBuf::from("/tmp/recordstore.log")),
        };
        let config = LoggingConfig::from_settings(&settings);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/recordstore.log")));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let settings = LoggingSettings {
            level: Some("[[[".to_string()),
            ..LoggingSettings::default()
        };
        // Must not panic; an unparsable directive is replaced by the default.
        let config = LoggingConfig::from_settings(&settings);
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
