//! HTTP protocol layer module
//!
//! Protocol helpers decoupled from the mount: content types, validators,
//! byte ranges and response builders.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use cache::Validators;
pub use range::ByteRange;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_file_response, build_partial_response, build_redirect_response, HttpResponse,
};
