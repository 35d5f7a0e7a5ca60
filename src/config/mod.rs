// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use config::builder::{ConfigBuilder, DefaultState};
use std::net::{SocketAddr, ToSocketAddrs};

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig};

/// Default config file name (extension is resolved by the `config` crate)
pub const DEFAULT_CONFIG_FILE: &str = "cookie_server";

/// Prefix for environment overrides, e.g. `COOKIE_SERVER__SERVER__PORT=8080`
const ENV_PREFIX: &str = "COOKIE_SERVER";

impl Config {
    /// Load configuration from the default file, environment and defaults
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified file path (without extension)
    /// The file is optional; missing keys fall back to the defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Parse configuration from TOML text layered over the defaults
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Resolve `host:port` to a socket address, preferring IPv4
    pub fn resolve_socket_addr(&self) -> Result<SocketAddr, String> {
        let host = &self.server.host;
        let target = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.server.port)
        } else {
            format!("{host}:{}", self.server.port)
        };

        let addrs: Vec<SocketAddr> = target
            .to_socket_addrs()
            .map_err(|e| format!("Invalid address '{target}': {e}"))?
            .collect();

        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| format!("Address '{target}' did not resolve"))
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "localhost")?
        .set_default("server.port", 2999)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)
}
