// Signal handling module
//
// SIGTERM and SIGINT (Ctrl+C) both request a graceful shutdown.

use crate::logger;

/// Resolve when the process is asked to stop
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            let _ = tokio::signal::ctrl_c().await;
            logger::log_info("SIGINT received, shutting down");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => logger::log_info("SIGTERM received, shutting down"),
        _ = tokio::signal::ctrl_c() => logger::log_info("SIGINT received, shutting down"),
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        logger::log_info("Ctrl+C received, shutting down");
    }
}
