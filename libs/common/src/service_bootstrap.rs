//! Unified service bootstrap utilities
//!
//! Provides common initialization functionality for all collector services,
//! including startup banners, logging initialization, and environment setup.

use crate::bootstrap_args::ServiceArgs;
use crate::logging::{self, LogConfig};
use tracing::info;

/// Service metadata for startup
pub struct ServiceInfo {
    /// Service name (e.g., "envsrv")
    pub name: String,
    /// Service version from Cargo.toml
    pub version: String,
    /// Service description
    pub description: String,
}

impl ServiceInfo {
    /// Create new service info
    ///
    /// The version is taken from the calling crate, so pass `env!("CARGO_PKG_VERSION")`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Print unified startup banner
///
/// `details` are extra `key: value` lines (sensor, bus, relay) printed under the header.
pub fn print_startup_banner(service: &ServiceInfo, details: &[(&str, String)]) {
    let banner = r#"
 ███████╗███╗   ██╗██╗   ██╗███████╗██████╗ ██╗   ██╗
 ██╔════╝████╗  ██║██║   ██║██╔════╝██╔══██╗██║   ██║
 █████╗  ██╔██╗ ██║██║   ██║███████╗██████╔╝██║   ██║
 ██╔══╝  ██║╚██╗██║╚██╗ ██╔╝╚════██║██╔══██╗╚██╗ ██╔╝
 ███████╗██║ ╚████║ ╚████╔╝ ███████║██║  ██║ ╚████╔╝
 ╚══════╝╚═╝  ╚═══╝  ╚═══╝  ╚══════╝╚═╝  ╚═╝  ╚═══╝
    "#;

    info!("{}", banner);
    info!("");
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    for (key, value) in details {
        info!(" {}: {}", key, value);
    }
    info!("");
}

/// Initialize logging for a service with standard configuration
///
/// Filter priority:
/// 1. `RUST_LOG` environment variable
/// 2. `--log-level` / `--debug` from the command line
pub fn init_logging(service: &ServiceInfo, args: &ServiceArgs) -> anyhow::Result<()> {
    let log_config = LogConfig {
        service_name: service.name.clone(),
        log_dir: args.log_dir.clone(),
        filter: args.filter_directive(),
        ansi: !args.no_color,
    };

    logging::init_with_config(log_config).map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Parse `KEY=VALUE` lines of a `.env` file, skipping comments and blanks
#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn parse_env_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Load environment variables in development mode
///
/// In debug builds, reads `.env` and sets variables that are not already set.
/// In release builds, this is a no-op (deployments set variables externally).
pub fn load_development_env() {
    #[cfg(debug_assertions)]
    {
        if let Ok(content) = std::fs::read_to_string(".env") {
            for (key, value) in parse_env_lines(&content) {
                // Only set if not already set
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}
