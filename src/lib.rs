//! Static asset server: one directory mounted under one URL prefix.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use error::{Result, ServerError};
