//! Validators for conditional requests
//!
//! `ETag` and `Last-Modified` generation plus `If-None-Match`,
//! `If-Modified-Since` and `If-Range` evaluation.

use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Generate a quoted `ETag` from file content, e.g. `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Check `If-None-Match` against the server `ETag`
///
/// Supports a single tag, a comma separated list, weak tags and `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}

/// True when the file has not changed since the client's copy.
/// HTTP dates carry whole seconds, so sub-second mtimes are truncated.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}

/// Validators for one representation of a file
#[derive(Debug, Clone)]
pub struct Validators {
    pub etag: String,
    pub last_modified: Option<String>,
    modified: Option<SystemTime>,
}

impl Validators {
    pub fn new(content: &[u8], modified: Option<SystemTime>) -> Self {
        Self {
            etag: generate_etag(content),
            last_modified: modified.map(format_http_date),
            modified,
        }
    }

    /// Whether a `304 Not Modified` answers the request.
    /// `If-None-Match` takes precedence over `If-Modified-Since`.
    pub fn is_fresh(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if if_none_match.is_some() {
            return check_etag_match(if_none_match, &self.etag);
        }
        self.modified
            .is_some_and(|m| not_modified_since(if_modified_since, m))
    }

    /// Whether a `Range` header may be honoured given `If-Range`
    pub fn allows_range(&self, if_range: Option<&str>) -> bool {
        let Some(value) = if_range.map(str::trim) else {
            return true;
        };
        if value.starts_with('"') {
            return value == self.etag;
        }
        self.last_modified.as_deref() == Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn epoch_plus(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_etag_consistency() {
        assert_eq!(generate_etag(b"same content"), generate_etag(b"same content"));
        assert_ne!(generate_etag(b"content a"), generate_etag(b"content b"));
        let etag = generate_etag(b"hello");
        assert!(etag.starts_with('"') && etag.ends_with('"'));
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_http_date() {
        assert_eq!(
            format_http_date(epoch_plus(784_111_777)),
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
    }

    #[test]
    fn test_not_modified_since() {
        let modified = epoch_plus(784_111_777);
        assert!(not_modified_since(Some("Sun, 06 Nov 1994 08:49:37 GMT"), modified));
        assert!(not_modified_since(Some("Mon, 07 Nov 1994 08:49:37 GMT"), modified));
        assert!(!not_modified_since(Some("Sat, 05 Nov 1994 08:49:37 GMT"), modified));
        assert!(!not_modified_since(Some("garbage"), modified));
        assert!(!not_modified_since(None, modified));
    }

    #[test]
    fn test_if_none_match_wins() {
        let v = Validators::new(b"hello", Some(epoch_plus(784_111_777)));
        let date = Some("Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(v.is_fresh(None, date));
        assert!(v.is_fresh(Some(v.etag.as_str()), None));
        assert!(!v.is_fresh(Some("\"other\""), date));
    }

    #[test]
    fn test_if_range() {
        let v = Validators::new(b"hello", Some(epoch_plus(784_111_777)));
        assert!(v.allows_range(None));
        assert!(v.allows_range(Some(v.etag.as_str())));
        assert!(v.allows_range(Some("Sun, 06 Nov 1994 08:49:37 GMT")));
        assert!(!v.allows_range(Some("\"stale\"")));
        assert!(!v.allows_range(Some("Sat, 05 Nov 1994 08:49:37 GMT")));
    }
}
