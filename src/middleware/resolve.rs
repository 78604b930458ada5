//! Request path resolution
//!
//! Maps a request URI path onto the filesystem below a root directory and
//! queries its metadata. Nothing is cached between requests.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use percent_encoding::percent_decode_str;
use tracing::warn;

use crate::error::{Result, StationError};

/// A filesystem entry found for a request.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// Joined filesystem path
    pub path: PathBuf,
    /// Whether the path is a directory
    pub is_dir: bool,
    /// Modification time, when the platform reports one
    pub modified: Option<SystemTime>,
}

/// Joins a request path onto `root` and stats the result.
///
/// Any stat failure is returned as an error; callers treat all of them as a
/// miss.
pub async fn resolve(root: &Path, request_path: &str) -> Result<ResolvedFile> {
    let path = join_request_path(root, request_path)?;

    if escapes_root(&clean(root), &path) {
        warn!(
            request_path,
            resolved = %path.display(),
            "Request path resolves outside the static root"
        );
    }

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| StationError::from_io(&path, e))?;

    Ok(ResolvedFile {
        is_dir: metadata.is_dir(),
        modified: metadata.modified().ok(),
        path,
    })
}

/// Percent-decodes `request_path` and joins it onto `root`, cleaning the
/// result lexically.
///
/// Empty and `.` segments are dropped and `..` removes the previous
/// component, root components included. The result is not confined to
/// `root`.
pub fn join_request_path(root: &Path, request_path: &str) -> Result<PathBuf> {
    let decoded = percent_decode_str(request_path)
        .decode_utf8()
        .map_err(|_| StationError::InvalidPath(request_path.to_string()))?;

    let mut joined = clean(root);
    for segment in decoded.split('/') {
        push_segment(&mut joined, segment);
    }

    if joined.as_os_str().is_empty() {
        joined.push(".");
    }
    Ok(joined)
}

/// Whether the raw request path contains a `..` segment.
pub fn contains_dot_dot(request_path: &str) -> bool {
    request_path.split(['/', '\\']).any(|segment| segment == "..")
}

fn escapes_root(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rest) => rest.components().any(|c| c == Component::ParentDir),
        Err(_) => true,
    }
}

fn clean(root: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in root.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => push_segment(&mut cleaned, ".."),
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

fn push_segment(path: &mut PathBuf, segment: &str) {
    match segment {
        "" | "." => {}
        ".." => match path.components().next_back() {
            Some(Component::Normal(_)) => {
                path.pop();
            }
            Some(Component::RootDir | Component::Prefix(_)) => {}
            _ => path.push(".."),
        },
        segment => path.push(segment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(root: &str, request_path: &str) -> PathBuf {
        join_request_path(Path::new(root), request_path).unwrap()
    }

    #[test]
    fn test_join_plain_path() {
        assert_eq!(join("public", "/css/app.css"), PathBuf::from("public/css/app.css"));
        assert_eq!(join("public", "/"), PathBuf::from("public"));
        assert_eq!(join("/srv/www", "//a/./b"), PathBuf::from("/srv/www/a/b"));
    }

    #[test]
    fn test_join_current_dir_root() {
        assert_eq!(join(".", "/testdata/bar"), PathBuf::from("testdata/bar"));
        assert_eq!(join(".", "/"), PathBuf::from("."));
    }

    #[test]
    fn test_join_decodes_percent_escapes() {
        assert_eq!(join("public", "/a%20b.txt"), PathBuf::from("public/a b.txt"));
    }

    #[test]
    fn test_join_rejects_invalid_utf8() {
        let err = join_request_path(Path::new("public"), "/%ff").unwrap_err();
        assert!(matches!(err, StationError::InvalidPath(_)));
    }

    #[test]
    fn test_join_dot_dot_is_not_confined() {
        assert_eq!(join("public", "/a/../b"), PathBuf::from("public/b"));
        assert_eq!(join("public", "/../secret"), PathBuf::from("secret"));
        assert_eq!(join(".", "/../x"), PathBuf::from("../x"));
        assert_eq!(join("/srv", "/../../etc"), PathBuf::from("/etc"));
    }

    #[test]
    fn test_escapes_root() {
        let root = clean(Path::new("public"));
        assert!(!escapes_root(&root, &join("public", "/a/b")));
        assert!(escapes_root(&root, &join("public", "/../secret")));

        let root = clean(Path::new("."));
        assert!(!escapes_root(&root, &join(".", "/testdata/bar")));
        assert!(escapes_root(&root, &join(".", "/../x")));
    }

    #[test]
    fn test_contains_dot_dot() {
        assert!(contains_dot_dot("/a/../b"));
        assert!(contains_dot_dot("/.."));
        assert!(!contains_dot_dot("/a..b/c"));
        assert!(!contains_dot_dot("/a/b"));
    }

    #[tokio::test]
    async fn test_resolve_file_and_dir() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata");

        let file = resolve(&root, "/bar").await.unwrap();
        assert!(!file.is_dir);
        assert!(file.modified.is_some());

        let dir = resolve(&root, "/sub").await.unwrap();
        assert!(dir.is_dir);
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata");
        let err = resolve(&root, "/bar.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_through_regular_file() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata");
        let err = resolve(&root, "/bar/x").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, StationError::Io { .. }));
    }
}
