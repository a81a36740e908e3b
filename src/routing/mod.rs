//! Routing module
//!
//! The only route is the static mount: one prefix, one directory.

pub mod mount;

pub use mount::{decode_path, relative_path, Mount, MountMatch, PathRejection};
