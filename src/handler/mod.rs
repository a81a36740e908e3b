//! Request handler module
//!
//! Dispatches requests to the static mount.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
