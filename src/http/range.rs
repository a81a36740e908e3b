//! HTTP Range request parsing module
//!
//! Single `bytes` range only (RFC 9110 §14). Multi-range requests are
//! answered with the full representation.

use std::ops::RangeInclusive;

/// Outcome of evaluating a `Range` header against a file length
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRange {
    /// Serve the whole file (no header, malformed, or multi-range)
    Full,
    /// Serve the inclusive byte span
    Partial(RangeInclusive<usize>),
    /// Answer `416 Range Not Satisfiable`
    Unsatisfiable,
}

impl ByteRange {
    /// Evaluate a `Range` header for a file of `len` bytes
    ///
    /// # Examples
    /// ```
    /// use flaps_server::http::range::ByteRange;
    ///
    /// assert_eq!(ByteRange::parse(Some("bytes=0-99"), 1000), ByteRange::Partial(0..=99));
    /// assert_eq!(ByteRange::parse(Some("bytes=-10"), 1000), ByteRange::Partial(990..=999));
    /// assert_eq!(ByteRange::parse(None, 1000), ByteRange::Full);
    /// ```
    pub fn parse(header: Option<&str>, len: usize) -> Self {
        let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return Self::Full;
        };
        if spec.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = spec.split_once('-') else {
            return Self::Full;
        };

        match (first.trim(), last.trim()) {
            ("", "") => Self::Full,
            ("", suffix) => suffix
                .parse::<usize>()
                .map_or(Self::Full, |n| Self::suffix(n, len)),
            (start, "") => start
                .parse::<usize>()
                .map_or(Self::Full, |s| Self::bounded(s, None, len)),
            (start, end) => match (start.parse::<usize>(), end.parse::<usize>()) {
                (Ok(s), Ok(e)) if s <= e => Self::bounded(s, Some(e), len),
                _ => Self::Full,
            },
        }
    }

    fn suffix(n: usize, len: usize) -> Self {
        if n == 0 || len == 0 {
            return Self::Unsatisfiable;
        }
        Self::Partial(len.saturating_sub(n)..=len - 1)
    }

    fn bounded(start: usize, end: Option<usize>, len: usize) -> Self {
        if start >= len {
            return Self::Unsatisfiable;
        }
        let end = end.map_or(len - 1, |e| e.min(len - 1));
        Self::Partial(start..=end)
    }
}
