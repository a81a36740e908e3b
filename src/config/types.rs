// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub mount: MountConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads, CPU cores when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Static directory mount
#[derive(Debug, Deserialize, Clone)]
pub struct MountConfig {
    /// URL prefix, "/" or a sub-path such as "/flap"
    pub prefix: String,
    /// Local directory served under the prefix
    pub directory: String,
    /// Display name of the mount, only used in logs
    pub name: String,
    /// Serve index files for directories and `404.html` for misses
    pub html: bool,
    pub index_files: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on a single connection's lifetime, in seconds
    pub request_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections on shutdown
    pub shutdown_grace: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
}
