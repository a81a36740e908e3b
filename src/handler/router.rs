//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, mount
//! matching, dispatch and access logging.

use hyper::body::Body as _;
use hyper::header::{HeaderMap, HeaderValue, SERVER};
use hyper::{Method, Request};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, MountMatch};

/// Request fields needed once routing is done
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_range: Option<String>,
    pub range: Option<String>,
}

impl<'a> RequestContext<'a> {
    fn new(path: &'a str, query: Option<&'a str>, method: &Method, headers: &HeaderMap) -> Self {
        Self {
            path,
            query,
            is_head: method == Method::HEAD,
            if_none_match: header_string(headers, "if-none-match"),
            if_modified_since: header_string(headers, "if-modified-since"),
            if_range: header_string(headers, "if-range"),
            range: header_string(headers, "range"),
        }
    }
}

/// Main entry point for HTTP request handling. The request body is ignored:
/// only `GET` and `HEAD` are served.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let ctx = RequestContext::new(
        parts.uri.path(),
        parts.uri.query(),
        &parts.method,
        &parts.headers,
    );

    let mut response = route_request(&ctx, &parts.method, &state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.map_or_else(|| "-".to_string(), |a| a.ip().to_string()),
            parts.method.to_string(),
            ctx.path.to_string(),
        );
        entry.query = ctx.query.map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.referer = header_string(&parts.headers, "referer");
        entry.user_agent = header_string(&parts.headers, "user-agent");
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request(
    ctx: &RequestContext<'_>,
    method: &Method,
    state: &AppState,
) -> HttpResponse {
    // 1. Only GET and HEAD reach the mount
    if method != Method::GET && method != Method::HEAD {
        logger::log_debug(&format!("Method not allowed: {method} {}", ctx.path));
        return http::build_405_response();
    }

    // 2. Decode once, then match the prefix on the decoded path
    let Ok(decoded) = routing::decode_path(ctx.path) else {
        logger::log_debug(&format!("Undecodable request path: {}", ctx.path));
        return http::build_404_response();
    };

    // 3. Mount prefix
    let mount = &state.mount;
    match mount.match_path(&decoded) {
        MountMatch::Inside(remainder) => static_files::serve_mount(ctx, mount, remainder).await,
        MountMatch::AddSlash => {
            let location = match ctx.query {
                Some(q) => format!("{}/?{q}", mount.prefix()),
                None => format!("{}/", mount.prefix()),
            };
            http::build_redirect_response(&location)
        }
        MountMatch::Outside => http::build_404_response(),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
