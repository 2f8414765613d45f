//! Confining caller-supplied paths to the gallery root
//!
//! Every path argument coming over HTTP goes through [`SanitizedPath`] before
//! it touches the filesystem. Only plain name components survive: `..`, `.`,
//! root and drive prefixes are dropped, then the rest is joined to the root.
//! The result can't name anything above the root, no matter how many `../`
//! or leading slashes the caller stacks up.

use std::path::{Component, Path, PathBuf};

/// A path known to sit at or below the gallery root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPath {
    relative: PathBuf,
    resolved: PathBuf,
}

impl SanitizedPath {
    pub fn new(root: &Path, raw: &str) -> Self {
        let relative: PathBuf = Path::new(raw)
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir => None,
            })
            .collect();
        let resolved = root.join(&relative);
        Self { relative, resolved }
    }

    /// Path relative to the root (empty for the root itself)
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Absolute path for filesystem calls
    pub fn as_path(&self) -> &Path {
        &self.resolved
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.resolved
    }
}

impl AsRef<Path> for SanitizedPath {
    fn as_ref(&self) -> &Path {
        &self.resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/gallery")
    }

    #[test]
    fn test_plain_relative_path() {
        let p = SanitizedPath::new(&root(), "holiday/day1/a.png");
        assert_eq!(p.as_path(), Path::new("/srv/gallery/holiday/day1/a.png"));
        assert_eq!(p.relative(), Path::new("holiday/day1/a.png"));
    }

    #[test]
    fn test_empty_is_root() {
        let p = SanitizedPath::new(&root(), "");
        assert_eq!(p.as_path(), root().as_path());
        assert_eq!(p.relative(), Path::new(""));
        assert_eq!(SanitizedPath::new(&root(), "/").as_path(), root().as_path());
        assert_eq!(SanitizedPath::new(&root(), "./.").as_path(), root().as_path());
    }

    /// Test: Leading separators are stripped
    /// Validates: Absolute paths are re-rooted, not honored
    #[test]
    fn test_absolute_path_rerooted() {
        let p = SanitizedPath::new(&root(), "/etc/passwd");
        assert_eq!(p.as_path(), Path::new("/srv/gallery/etc/passwd"));
        let p = SanitizedPath::new(&root(), "///etc//passwd");
        assert_eq!(p.as_path(), Path::new("/srv/gallery/etc/passwd"));
    }

    /// Test: Traversal can't escape the root
    /// Validates: For every input, result is under the root and has no `..`
    #[test]
    fn test_traversal_never_escapes() {
        let inputs = [
            "..",
            "../",
            "../../etc/passwd",
            "a/../../b",
            "/../../..",
            "a/b/../../../../c",
            "./../x",
            "....//x",
            "a/./../b/..",
            "/..",
        ];
        for raw in inputs {
            let p = SanitizedPath::new(&root(), raw);
            assert!(p.as_path().starts_with(root()), "{} escaped: {}", raw, p.as_path().display());
            assert!(
                !p.as_path().components().any(|c| c == Component::ParentDir),
                "{} kept a parent segment",
                raw
            );
        }
        assert_eq!(
            SanitizedPath::new(&root(), "../../etc/passwd").as_path(),
            Path::new("/srv/gallery/etc/passwd")
        );
    }

    #[test]
    fn test_dots_inside_names_are_kept() {
        let p = SanitizedPath::new(&root(), "a..b/c.d.tif");
        assert_eq!(p.relative(), Path::new("a..b/c.d.tif"));
    }
}
