//! URL to build-directory path resolution.

use std::path::{Path, PathBuf};

/// Resolve a request URL to a file under `serve_root`.
///
/// Directories resolve to their `index.html`. Anything that escapes the
/// root, directly or through a symlink, resolves to nothing.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = serve_root.join(&clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Strip query and fragment, decode, trim slashes.
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

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

    fn site() -> tempfile::TempDir {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("index.html"), "<body></body>").unwrap();
        fs::write(temp.path().join("css/main.min.css"), "a{}").unwrap();
        fs::write(temp.path().join("docs/index.html"), "docs").unwrap();
        fs::write(temp.path().join("with space.html"), "x").unwrap();
        temp
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/css/main.min.css?v=3"), "css/main.min.css");
        assert_eq!(normalize_url("/with%20space.html#top"), "with space.html");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_resolves_files_and_indexes() {
        let temp = site();
        let root = temp.path();

        let index = resolve_path("/", root).unwrap();
        assert!(index.ends_with("index.html"));
        assert!(resolve_path("/css/main.min.css", root).is_some());
        assert!(resolve_path("/docs/", root).unwrap().ends_with("docs/index.html"));
        assert!(resolve_path("/with%20space.html", root).is_some());
        assert!(resolve_path("/css/", root).is_none());
        assert!(resolve_path("/missing.js", root).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let temp = site();
        let root = temp.path().join("docs");

        assert!(resolve_path("/../index.html", &root).is_none());
        assert!(resolve_path("/%2e%2e/index.html", &root).is_none());
    }
}
