//! MIME type detection module
//!
//! Returns the Content-Type for a served file based on its extension.

use std::path::Path;

/// Content type of a path, `application/octet-stream` when unknown
pub fn content_type_for(path: &Path) -> &'static str {
    get_content_type(path.extension().and_then(|e| e.to_str()))
}

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use flaps_server::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(Some("JPG")), "image/jpeg");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "text" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",

        // Scripts and data
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives and documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_assets() {
        assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
        assert_eq!(get_content_type(Some("js")), "text/javascript; charset=utf-8");
        assert_eq!(get_content_type(Some("jpg")), "image/jpeg");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("mp3")), "audio/mpeg");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(get_content_type(Some("PNG")), "image/png");
        assert_eq!(get_content_type(Some("Css")), "text/css; charset=utf-8");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
        assert_eq!(
            content_type_for(Path::new("flaps/Makefile")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            content_type_for(Path::new("flaps/tub.jpg")),
            "image/jpeg"
        );
    }
}
