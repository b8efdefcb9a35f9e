//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::utils::path::is_contained;

/// What a request URL maps to under the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A regular file (a directory's `index.html` included)
    File(PathBuf),
    /// A directory without `index.html`
    Listing(PathBuf),
}

/// Resolve a request URL against `root`.
///
/// Returns `None` for missing paths and for anything that escapes `root`,
/// whether through `..` segments or symlinks.
pub fn resolve(url: &str, root: &Path) -> Option<Target> {
    let clean = normalize_url(url);
    let relative = Path::new(&clean);
    if !is_contained(relative) {
        return None;
    }

    let canonical = root.join(relative).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(Target::File(canonical));
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        return Some(if index.is_file() {
            Target::File(index)
        } else {
            Target::Listing(canonical)
        });
    }

    None
}

/// Decode, strip the query string and trim slashes.
pub fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<body></body>").unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/app.css"), ".a{}").unwrap();
        fs::create_dir_all(dir.path().join("img sprite")).unwrap();
        dir
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/css/app.css?v=1"), "css/app.css");
        assert_eq!(normalize_url("/img%20sprite/"), "img sprite");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_root_serves_index() {
        let dir = site();
        let Some(Target::File(path)) = resolve("/", dir.path()) else {
            panic!("expected index.html");
        };
        assert!(path.ends_with("index.html"));
    }

    #[test]
    fn test_file_and_listing() {
        let dir = site();
        assert!(matches!(
            resolve("/css/app.css?spritely=1", dir.path()),
            Some(Target::File(_))
        ));
        assert!(matches!(
            resolve("/img%20sprite/", dir.path()),
            Some(Target::Listing(_))
        ));
        assert_eq!(resolve("/missing.html", dir.path()), None);
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = site();
        assert_eq!(resolve("/../etc/passwd", dir.path()), None);
        assert_eq!(resolve("/css/%2e%2e/%2e%2e/x", dir.path()), None);
    }
}
