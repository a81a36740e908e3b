//! Static file serving module
//!
//! Resolves a mount remainder to a file under the root and builds the
//! response: full, partial, not-modified or not-found.

use hyper::body::Bytes;
use hyper::StatusCode;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::handler::router::RequestContext;
use crate::http::{self, mime, ByteRange, HttpResponse, Validators};
use crate::logger;
use crate::routing::{self, Mount, PathRejection};

const NOT_FOUND_PAGE: &str = "404.html";

/// Result of looking a path up under the mount root
#[derive(Debug)]
pub enum Lookup {
    File { path: PathBuf, metadata: Metadata },
    Directory(PathBuf),
    NotFound,
}

/// Serve the part of the request path that follows the mount prefix
pub async fn serve_mount(
    ctx: &RequestContext<'_>,
    mount: &Mount,
    remainder: &str,
) -> HttpResponse {
    let relative = match routing::relative_path(remainder) {
        Ok(p) => p,
        Err(PathRejection::Traversal) => {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            return not_found(ctx, mount).await;
        }
        Err(PathRejection::Encoding) => return not_found(ctx, mount).await,
    };

    match lookup(mount.root(), &mount.root().join(&relative)).await {
        Lookup::File { path, metadata } => serve_file(ctx, &path, &metadata).await,
        Lookup::Directory(dir) if mount.html => serve_index(ctx, mount, &relative, &dir).await,
        Lookup::Directory(_) | Lookup::NotFound => not_found(ctx, mount).await,
    }
}

/// Resolve `candidate` and keep it only if it stays inside `root`.
/// Canonicalizing first means symlinks pointing outside are refused too.
pub async fn lookup(root: &Path, candidate: &Path) -> Lookup {
    // File not found is common (404), no need to log
    let Ok(resolved) = fs::canonicalize(candidate).await else {
        return Lookup::NotFound;
    };
    if !resolved.starts_with(root) {
        logger::log_warning(&format!(
            "Path escapes static root: {} -> {}",
            candidate.display(),
            resolved.display()
        ));
        return Lookup::NotFound;
    }

    match fs::metadata(&resolved).await {
        Ok(metadata) if metadata.is_file() => Lookup::File {
            path: resolved,
            metadata,
        },
        Ok(metadata) if metadata.is_dir() => Lookup::Directory(resolved),
        _ => Lookup::NotFound,
    }
}

/// Directory request in html mode: add the trailing slash, then try index files
async fn serve_index(
    ctx: &RequestContext<'_>,
    mount: &Mount,
    relative: &Path,
    dir: &Path,
) -> HttpResponse {
    if !ctx.path.ends_with('/') {
        // Built from the prefix, never from the raw request path
        let url = mount.directory_url(relative);
        let location = match ctx.query {
            Some(q) => format!("{url}?{q}"),
            None => url,
        };
        return http::build_redirect_response(&location);
    }

    for index in &mount.index_files {
        if let Lookup::File { path, metadata } = lookup(mount.root(), &dir.join(index)).await {
            return serve_file(ctx, &path, &metadata).await;
        }
    }
    not_found(ctx, mount).await
}

/// 404, or the mount's own `404.html` page in html mode
async fn not_found(ctx: &RequestContext<'_>, mount: &Mount) -> HttpResponse {
    if mount.html {
        let page = mount.root().join(NOT_FOUND_PAGE);
        if let Lookup::File { path, .. } = lookup(mount.root(), &page).await {
            if let Some(content) = read_file(&path).await {
                return http::build_file_response(
                    StatusCode::NOT_FOUND,
                    content,
                    mime::content_type_for(&path),
                    None,
                    ctx.is_head,
                );
            }
        }
    }
    http::build_404_response()
}

/// Serve a resolved regular file, honouring validators and ranges
async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    metadata: &Metadata,
) -> HttpResponse {
    let Some(content) = read_file(path).await else {
        return http::build_404_response();
    };
    let content_type = mime::content_type_for(path);
    let validators = Validators::new(&content, metadata.modified().ok());

    if validators.is_fresh(ctx.if_none_match.as_deref(), ctx.if_modified_since.as_deref()) {
        return http::build_304_response(&validators);
    }

    let range = if validators.allows_range(ctx.if_range.as_deref()) {
        ByteRange::parse(ctx.range.as_deref(), content.len())
    } else {
        ByteRange::Full
    };

    match range {
        ByteRange::Partial(span) => {
            http::build_partial_response(&content, span, content_type, &validators, ctx.is_head)
        }
        ByteRange::Unsatisfiable => http::build_416_response(content.len()),
        ByteRange::Full => http::build_file_response(
            StatusCode::OK,
            content,
            content_type,
            Some(&validators),
            ctx.is_head,
        ),
    }
}

async fn read_file(path: &Path) -> Option<Bytes> {
    match fs::read(path).await {
        Ok(content) => Some(Bytes::from(content)),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            None
        }
    }
}
