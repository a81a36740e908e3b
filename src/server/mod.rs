//! Server module
//!
//! Listener creation, connection handling, shutdown signals and the
//! accept loop.

pub mod connection;
pub mod listener;
pub mod serve;
pub mod signal;

pub use listener::create_listener;
pub use serve::serve;
pub use signal::shutdown_signal;
