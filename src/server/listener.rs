// Listener module
// Creates the TCP listener the static server accepts on

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};

const BACKLOG: i32 = 128;

/// Create a `TcpListener` with `SO_REUSEADDR` enabled, so a restarted
/// server can rebind a port still in `TIME_WAIT`.
///
/// Must be called from within a Tokio runtime.
pub fn create_listener(addr: SocketAddr) -> Result<TcpListener> {
    bind(addr).map_err(|source| ServerError::Bind { addr, source })
}

fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    // socket2::Socket -> std::net::TcpListener -> tokio::net::TcpListener
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ephemeral_port() {
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_port_in_use() {
        let first = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = first.local_addr().unwrap();
        // SO_REUSEADDR does not allow sharing a port that is still listening
        assert!(matches!(
            create_listener(addr),
            Err(ServerError::Bind { .. })
        ));
    }
}
