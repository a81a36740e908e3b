//! HTTP response building module
//!
//! Builders for every status the static mount can answer with.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::ops::RangeInclusive;

use super::cache::Validators;

pub type HttpResponse = Response<Full<Bytes>>;

const ALLOWED_METHODS: &str = "GET, HEAD";

/// Build 404 Not Found response
pub fn build_404_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(b"Not Found")))
        .unwrap_or_else(|e| fallback("404", &e))
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Allow", ALLOWED_METHODS)
        .body(Full::new(Bytes::from_static(b"Method Not Allowed")))
        .unwrap_or_else(|e| fallback("405", &e))
}

/// Build 307 redirect, used to add the trailing slash to mounts and directories
pub fn build_redirect_response(location: &str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header("Location", location)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("307", &e))
}

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators) -> HttpResponse {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", &validators.etag);
    if let Some(last_modified) = &validators.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }
    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("304", &e))
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> HttpResponse {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{file_size}"))
        .body(Full::new(Bytes::from_static(b"Range Not Satisfiable")))
        .unwrap_or_else(|e| fallback("416", &e))
}

/// Build a whole-file response. `HEAD` keeps the headers and drops the body.
pub fn build_file_response(
    status: StatusCode,
    data: Bytes,
    content_type: &str,
    validators: Option<&Validators>,
    is_head: bool,
) -> HttpResponse {
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", data.len());

    if let Some(v) = validators {
        builder = builder.header("Accept-Ranges", "bytes").header("ETag", &v.etag);
        if let Some(last_modified) = &v.last_modified {
            builder = builder.header("Last-Modified", last_modified);
        }
    }

    let body = if is_head { Bytes::new() } else { data };
    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("file", &e))
}

/// Build 206 Partial Content response for one byte span of `data`
pub fn build_partial_response(
    data: &Bytes,
    span: RangeInclusive<usize>,
    content_type: &str,
    validators: &Validators,
    is_head: bool,
) -> HttpResponse {
    let (start, end) = (*span.start(), *span.end());
    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", end - start + 1)
        .header("Content-Range", format!("bytes {start}-{end}/{}", data.len()))
        .header("Accept-Ranges", "bytes")
        .header("ETag", &validators.etag);
    if let Some(last_modified) = &validators.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }

    let body = if is_head {
        Bytes::new()
    } else {
        data.slice(start..=end)
    };
    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("206", &e))
}

/// Log response build error and degrade to an empty 500
fn fallback(kind: &str, error: &hyper::http::Error) -> HttpResponse {
    crate::logger::log_error(&format!("Failed to build {kind} response: {error}"));
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
