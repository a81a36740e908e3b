//! Startup error types
//!
//! Request-time failures never surface here: they become HTTP responses.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop the server from coming up
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid mount prefix '{0}': must not contain '..' segments")]
    InvalidPrefix(String),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file: {0}")]
    Log(#[source] std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
