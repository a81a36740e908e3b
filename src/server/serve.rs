// Server loop module
// Accepts connections until shutdown, then drains in-flight ones

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::{accept_connection, ConnectionTracker};
use crate::config::AppState;
use crate::error::Result;
use crate::logger;

/// Run the accept loop on `listener` until `shutdown` resolves.
///
/// After shutdown the listener is closed, open connections are told to
/// finish their current request, and the loop waits up to
/// `performance.shutdown_grace` seconds for them.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let tracker = Arc::new(ConnectionTracker::new());
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &tracker, stop_rx.clone());
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    let _ = stop_tx.send(true);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    let open = tracker.active();
    if open > 0 {
        logger::log_info(&format!(
            "Waiting up to {}s for {open} open connection(s)",
            grace.as_secs()
        ));
    }
    if tokio::time::timeout(grace, tracker.wait_idle()).await.is_err() {
        logger::log_warning(&format!(
            "Shutdown grace period elapsed with {} connection(s) still open",
            tracker.active()
        ));
    }

    logger::log_info("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_over_socket_and_stops() {
        let outer = tempfile::tempdir().unwrap();
        let flaps = outer.path().join("flaps");
        std::fs::create_dir(&flaps).unwrap();
        std::fs::write(flaps.join("index.html"), "hello").unwrap();

        let overrides = Overrides {
            prefix: Some("/flap".to_string()),
            directory: Some(flaps.to_string_lossy().into_owned()),
            ..Overrides::default()
        };
        let missing = outer.path().join("no-config");
        let mut cfg = Config::load_from(missing.to_str().unwrap(), &overrides).unwrap();
        cfg.logging.access_log = false;
        let state = Arc::new(AppState::new(cfg).unwrap());

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state, async {
            let _ = stopped.await;
        }));

        let ok = raw_get(addr, "/flap/index.html").await;
        assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
        assert!(ok.ends_with("\r\n\r\nhello"), "{ok}");

        let missing = raw_get(addr, "/flap/missing.txt").await;
        assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

        let outside = raw_get(addr, "/index.html").await;
        assert!(outside.starts_with("HTTP/1.1 404"), "{outside}");

        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
