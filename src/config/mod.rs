// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::{Result, ServerError};

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, MountConfig, PerformanceConfig, ServerConfig};

/// Default config file basename, extension is optional
pub const DEFAULT_CONFIG_PATH: &str = "flaps";

/// Values given on the command line; they win over file and environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub prefix: Option<String>,
    pub directory: Option<String>,
    pub workers: Option<usize>,
}

impl Config {
    /// Load configuration from the specified file path (extension optional).
    /// A missing file is not an error: defaults and environment still apply.
    pub fn load_from(config_path: &str, overrides: &Overrides) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("mount.prefix", "/")?
            .set_default("mount.directory", "flaps")?
            .set_default("mount.name", "flappy-tub")?
            .set_default("mount.html", false)?
            .set_default("mount.index_files", vec!["index.html"])?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.request_timeout", 30)?
            .set_default("performance.shutdown_grace", 5)?
            .set_default("http.server_name", "flaps-server")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FLAPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option("mount.prefix", overrides.prefix.clone())?
            .set_override_option("mount.directory", overrides.directory.clone())?
            .set_override_option(
                "server.workers",
                overrides.workers.and_then(|w| i64::try_from(w).ok()),
            )?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::InvalidAddress { addr, source })
    }
}
