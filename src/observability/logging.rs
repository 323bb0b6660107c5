//! Structured logging configuration.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

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
    /// Parses a format name. Unknown names fall back to pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// Filter precedence: `REMOTECONF_LOG`, `RUST_LOG`, `debug` when
    /// `verbose`, the configured level, then `info`. `REMOTECONF_LOG_FORMAT`
    /// and `REMOTECONF_LOG_FILE` override the format and file.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let directive = resolve_directive(
            env_value("REMOTECONF_LOG"),
            env_value("RUST_LOG"),
            verbose,
            settings.and_then(|s| s.level.clone()),
        );

        let format = env_value("REMOTECONF_LOG_FORMAT")
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or_else(LogFormat::default, |f| LogFormat::parse(&f));

        let file = env_value("REMOTECONF_LOG_FILE")
            .or_else(|| settings.and_then(|s| s.file.clone()))
            .map(PathBuf::from);

        Self {
            format,
            filter: EnvFilter::try_new(&directive).unwrap_or_else(|e| {
                eprintln!("invalid log filter '{directive}': {e}; using 'info'");
                EnvFilter::new("info")
            }),
            file,
        }
    }
}

fn resolve_directive(
    remoteconf_log: Option<String>,
    rust_log: Option<String>,
    verbose: bool,
    configured: Option<String>,
) -> String {
    remoteconf_log
        .or(rust_log)
        .or_else(|| verbose.then(|| "debug".to_string()))
        .or(configured)
        .unwrap_or_else(|| "info".to_string())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
