// Connection handling module
// Accepts single TCP connections, enforces the connection limit and serves
// HTTP/1 on each in its own task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Counts live connections and wakes the shutdown drain when it hits zero
#[derive(Default)]
pub struct ConnectionTracker {
    active: AtomicUsize,
    idle: Notify,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Reserve a slot, `None` when `limit` connections are already open
    pub fn try_acquire(self: &Arc<Self>, limit: Option<u64>) -> Option<ConnectionGuard> {
        // Increment first, then check, so two racing accepts cannot both pass
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = limit {
            if prev >= usize::try_from(max).unwrap_or(usize::MAX) {
                self.release();
                return None;
            }
        }
        Some(ConnectionGuard {
            tracker: Arc::clone(self),
        })
    }

    fn release(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolve once no connection is open
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not lost
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Holds one connection slot until dropped
pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}

/// Accept a connection if the limit allows and serve it in a spawned task.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    tracker: &Arc<ConnectionTracker>,
    shutdown: watch::Receiver<bool>,
) {
    let limit = state.config.performance.max_connections;
    let Some(guard) = tracker.try_acquire(limit) else {
        logger::log_warning(&format!(
            "Max connections reached: {}/{}. Connection from {peer_addr} rejected.",
            tracker.active(),
            limit.unwrap_or_default()
        ));
        drop(stream);
        return;
    };

    logger::log_connection_accepted(&peer_addr);
    tokio::spawn(serve_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        shutdown,
        guard,
    ));
}

/// Serve HTTP/1 on one connection until it closes, times out, or the
/// server shuts down (then in-flight requests finish and keep-alive ends).
async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
    _guard: ConnectionGuard,
) {
    let io = TokioIo::new(stream);
    let timeout = Duration::from_secs(state.config.performance.request_timeout);

    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { handler::handle_request(req, state, Some(peer_addr)).await }
    });
    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    let work = async {
        tokio::select! {
            result = conn.as_mut() => result,
            _ = shutdown.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    };

    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => logger::log_warning(&format!(
            "Connection from {peer_addr} timed out after {} seconds",
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_enforced() {
        let tracker = Arc::new(ConnectionTracker::new());
        let first = tracker.try_acquire(Some(2)).unwrap();
        let second = tracker.try_acquire(Some(2)).unwrap();
        assert!(tracker.try_acquire(Some(2)).is_none());
        assert_eq!(tracker.active(), 2);

        drop(first);
        assert_eq!(tracker.active(), 1);
        assert!(tracker.try_acquire(Some(2)).is_some());
        drop(second);
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn test_no_limit() {
        let tracker = Arc::new(ConnectionTracker::new());
        let guards: Vec<_> = (0..10).filter_map(|_| tracker.try_acquire(None)).collect();
        assert_eq!(guards.len(), 10);
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let tracker = Arc::new(ConnectionTracker::new());
        tracker.wait_idle().await;

        let guard = tracker.try_acquire(None).unwrap();
        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
