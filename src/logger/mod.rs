//! Logger module
//!
//! Provides logging utilities for the static server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error, warning and debug logging with a level filter
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use std::str::FromStr;

use crate::config::{AppState, Config};
use crate::error::ServerError;

/// Log verbosity, ordered from quietest to noisiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup. An unknown level falls
/// back to `info` with a warning.
pub fn init(config: &Config) -> Result<(), ServerError> {
    let (level, level_err) = match config.logging.level.parse::<Level>() {
        Ok(level) => (level, None),
        Err(e) => (Level::Info, Some(e)),
    };
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        level,
    )
    .map_err(ServerError::Log)?;

    if let Some(e) = level_err {
        log_warning(&format!("{e}, using info"));
    }
    Ok(())
}

fn enabled(level: Level) -> bool {
    writer::get().map_or(Level::Info, writer::LogWriter::level) >= level
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, state: &AppState) {
    if !enabled(Level::Info) {
        return;
    }
    let config = &state.config;
    write_info("======================================");
    write_info("Static server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!(
        "Mount '{}': {} -> {}",
        state.mount.name,
        state.mount.prefix(),
        state.mount.root().display()
    ));
    if state.mount.html {
        write_info(&format!(
            "HTML mode: index files {:?}, 404.html fallback",
            state.mount.index_files
        ));
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(&format!("[INFO] {message}"));
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_warning(&format!("Failed to serve connection: {err}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Debug > Level::Info);
        assert!(Level::Info > Level::Warn);
        assert!(Level::Warn > Level::Error);
    }
}
