//! Mount point module
//!
//! Maps one URL prefix onto one local directory and turns request paths
//! into paths relative to that directory.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::config::MountConfig;
use crate::error::{Result, ServerError};

/// Bytes escaped when a file name is written back into a URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where a request path falls relative to the mount prefix
#[derive(Debug, PartialEq, Eq)]
pub enum MountMatch<'a> {
    /// Under the prefix; carries the remainder without its leading slash
    Inside(&'a str),
    /// Exactly the prefix without trailing slash, redirect to `prefix/`
    AddSlash,
    /// Not handled by this mount
    Outside,
}

/// Why a request path could not be turned into a relative path
#[derive(Debug, PartialEq, Eq)]
pub enum PathRejection {
    /// Percent-decoding produced invalid UTF-8
    Encoding,
    /// A `..` segment or a separator smuggled inside a segment
    Traversal,
}

/// A static directory registered under a URL prefix
#[derive(Debug, Clone)]
pub struct Mount {
    prefix: String,
    root: PathBuf,
    pub name: String,
    pub html: bool,
    pub index_files: Vec<String>,
}

impl Mount {
    /// Validate the configured mount. The directory must exist; it is
    /// canonicalized once so containment checks compare real paths.
    pub fn new(cfg: &MountConfig) -> Result<Self> {
        let prefix = normalize_prefix(&cfg.prefix)?;
        let dir = Path::new(&cfg.directory);
        let root = match dir.canonicalize() {
            Ok(root) => root,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::MissingDirectory(dir.to_path_buf()));
            }
            Err(e) => return Err(ServerError::Io(e)),
        };
        if !root.is_dir() {
            return Err(ServerError::NotADirectory(dir.to_path_buf()));
        }

        Ok(Self {
            prefix,
            root,
            name: cfg.name.clone(),
            html: cfg.html,
            index_files: cfg.index_files.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Canonical directory served by this mount
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL of a directory below the mount, with trailing slash.
    /// Built from the prefix and the sanitized relative path only, so it
    /// always starts with a single `/`.
    pub fn directory_url(&self, relative: &Path) -> String {
        let mut url = if self.prefix == "/" {
            String::new()
        } else {
            self.prefix.clone()
        };
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                url.push('/');
                url.extend(utf8_percent_encode(&segment.to_string_lossy(), SEGMENT));
            }
        }
        url.push('/');
        url
    }

    /// Match a decoded request path against the prefix
    pub fn match_path<'a>(&self, path: &'a str) -> MountMatch<'a> {
        if self.prefix == "/" {
            return MountMatch::Inside(path.strip_prefix('/').unwrap_or(path));
        }
        if path == self.prefix {
            return MountMatch::AddSlash;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.starts_with('/') => MountMatch::Inside(&rest[1..]),
            _ => MountMatch::Outside,
        }
    }
}

/// Percent-decode a request path once, before prefix matching
pub fn decode_path(raw: &str) -> std::result::Result<Cow<'_, str>, PathRejection> {
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| PathRejection::Encoding)
}

/// Turn a decoded remainder into a path relative to the mount root.
///
/// Empty and `.` segments are dropped; `..`, backslashes and NUL bytes
/// reject the whole path, so the result can never climb above the root.
pub fn relative_path(remainder: &str) -> std::result::Result<PathBuf, PathRejection> {
    let mut relative = PathBuf::new();
    for segment in remainder.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(PathRejection::Traversal),
            s if s.contains(['\\', '\0']) => return Err(PathRejection::Traversal),
            s => relative.push(s),
        }
    }
    Ok(relative)
}

/// "/" stays "/", anything else gets one leading slash and no trailing one
fn normalize_prefix(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(ServerError::InvalidPrefix(raw.to_string()));
    }
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_at(prefix: &str, dir: &Path) -> Mount {
        Mount::new(&MountConfig {
            prefix: prefix.to_string(),
            directory: dir.to_string_lossy().into_owned(),
            name: "flappy-tub".to_string(),
            html: false,
            index_files: vec!["index.html".to_string()],
        })
        .unwrap()
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/").unwrap(), "/");
        assert_eq!(normalize_prefix("").unwrap(), "/");
        assert_eq!(normalize_prefix("flap").unwrap(), "/flap");
        assert_eq!(normalize_prefix("/flap/").unwrap(), "/flap");
        assert!(matches!(
            normalize_prefix("/a/../b"),
            Err(ServerError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mount = mount_at("/", dir.path());
        assert_eq!(mount.match_path("/index.html"), MountMatch::Inside("index.html"));
        assert_eq!(mount.match_path("/"), MountMatch::Inside(""));
        assert_eq!(mount.match_path("/flap/x.js"), MountMatch::Inside("flap/x.js"));
    }

    #[test]
    fn test_sub_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mount = mount_at("/flap", dir.path());
        assert_eq!(mount.match_path("/flap/index.html"), MountMatch::Inside("index.html"));
        assert_eq!(mount.match_path("/flap/"), MountMatch::Inside(""));
        assert_eq!(mount.match_path("/flap"), MountMatch::AddSlash);
        assert_eq!(mount.match_path("/flapjack"), MountMatch::Outside);
        assert_eq!(mount.match_path("/index.html"), MountMatch::Outside);
        assert_eq!(mount.match_path("/other"), MountMatch::Outside);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = Mount::new(&MountConfig {
            prefix: "/".to_string(),
            directory: dir.path().join("flaps").to_string_lossy().into_owned(),
            name: "flappy-tub".to_string(),
            html: false,
            index_files: Vec::new(),
        });
        assert!(matches!(result, Err(ServerError::MissingDirectory(_))));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("flap.js");
        std::fs::write(&file, "x").unwrap();
        let result = Mount::new(&MountConfig {
            prefix: "/".to_string(),
            directory: file.to_string_lossy().into_owned(),
            name: "flappy-tub".to_string(),
            html: false,
            index_files: Vec::new(),
        });
        assert!(matches!(result, Err(ServerError::NotADirectory(_))));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("a/b.js").unwrap(), PathBuf::from("a/b.js"));
        assert_eq!(relative_path("./a//b.js").unwrap(), PathBuf::from("a/b.js"));
        assert_eq!(relative_path("").unwrap(), PathBuf::new());
        assert_eq!(relative_path("my file.txt").unwrap(), PathBuf::from("my file.txt"));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/fl%61p/my%20file.txt").unwrap(), "/flap/my file.txt");
        assert_eq!(decode_path("/..%2fsecret").unwrap(), "/../secret");
        assert_eq!(decode_path("/%ff"), Err(PathRejection::Encoding));
    }

    #[test]
    fn test_directory_url() {
        let dir = tempfile::tempdir().unwrap();
        let root = mount_at("/", dir.path());
        assert_eq!(root.directory_url(Path::new("")), "/");
        assert_eq!(root.directory_url(Path::new("evil.example")), "/evil.example/");
        assert_eq!(root.directory_url(Path::new("a b/c?d")), "/a%20b/c%3Fd/");

        let sub = mount_at("/flap", dir.path());
        assert_eq!(sub.directory_url(Path::new("img")), "/flap/img/");
    }

    #[test]
    fn test_traversal_rejected() {
        assert_eq!(relative_path("../secret"), Err(PathRejection::Traversal));
        assert_eq!(relative_path("a/../../secret"), Err(PathRejection::Traversal));
        assert_eq!(relative_path("a\\..\\secret"), Err(PathRejection::Traversal));
        assert_eq!(relative_path("a\0b"), Err(PathRejection::Traversal));
    }
}
