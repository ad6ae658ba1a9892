//! Common command-line arguments for all collector processes
//!
//! Provides a unified argument structure that each service flattens into its own parser

use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::Args;

/// Common service startup arguments
///
/// These arguments are shared by every collector and provide
/// standard configuration options for logging and diagnostics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Args))]
pub struct ServiceArgs {
    /// Log level or filter spec (trace, debug, info, warn, error, or "info,envsrv=debug")
    #[cfg_attr(
        feature = "cli",
        arg(short = 'l', long, default_value = "info", env = "RUST_LOG")
    )]
    pub log_level: String,

    /// Enable debug mode with verbose output
    #[cfg_attr(feature = "cli", arg(long, env = "DEBUG"))]
    pub debug: bool,

    /// Disable colored output (useful when stdout is captured to a file)
    #[cfg_attr(feature = "cli", arg(long))]
    pub no_color: bool,

    /// Directory for daily rolling log files (console only when unset)
    #[cfg_attr(feature = "cli", arg(long, env = "ENVSRV_LOG_DIR"))]
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug: false,
            no_color: false,
            log_dir: None,
        }
    }
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    ///
    /// Filter specs such as `info,envsrv=debug` resolve to their leading level.
    pub fn parse_log_level(&self) -> tracing::Level {
        let leading = self
            .log_level
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match leading.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Filter directive handed to the subscriber
    ///
    /// Debug mode forces `debug` regardless of the configured level.
    pub fn filter_directive(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.debug || self.parse_log_level() >= tracing::Level::DEBUG
    }
}
