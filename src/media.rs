//! Media file classification by extension
//!
//! **Why**: The router, the API and the page script all need to agree on which
//! files are images, videos or audio, and which images must be decoded before
//! a browser can show them.
//!
//! **Used by**: api (count_frames), preview (get_preview), server (listing page)

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Coarse media category derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// Known extensions (lowercase, without dot)
pub const MEDIA_EXTENSIONS: &[(&str, MediaKind)] = &[
    ("bmp", MediaKind::Image),
    ("jpg", MediaKind::Image),
    ("jpeg", MediaKind::Image),
    ("jfif", MediaKind::Image),
    ("png", MediaKind::Image),
    ("apng", MediaKind::Image),
    ("tif", MediaKind::Image),
    ("tiff", MediaKind::Image),
    ("gif", MediaKind::Image),
    ("svg", MediaKind::Image),
    ("webp", MediaKind::Image),
    ("ico", MediaKind::Image),
    ("cur", MediaKind::Image),
    ("mp4", MediaKind::Video),
    ("avi", MediaKind::Video),
    ("webm", MediaKind::Video),
    ("ogg", MediaKind::Video),
    ("mov", MediaKind::Video),
    ("mp3", MediaKind::Audio),
    ("mpeg", MediaKind::Audio),
    ("wav", MediaKind::Audio),
    ("aac", MediaKind::Audio),
];

/// Image extensions browsers can't display; these always go through the preview pipeline
pub const PREPROCESSED_EXTENSIONS: &[&str] = &["tiff", "tif"];

/// Extension table as a JSON object (`{"png": "IMAGE", ...}`) for the page script
pub static EXTENSIONS_JSON: Lazy<String> = Lazy::new(|| {
    let table: BTreeMap<&str, MediaKind> = MEDIA_EXTENSIONS.iter().copied().collect();
    serde_json::to_string(&table).unwrap_or_else(|_| "{}".to_string())
});

/// Lowercased last dot-separated segment of the file name.
///
/// Only the final path component is considered, so `a.png/b` has no extension.
/// A name without a dot has none either.
pub fn extension(path: impl AsRef<Path>) -> Option<String> {
    let name = path.as_ref().file_name()?.to_str()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Media kind of a file name, or `None` for generic files
pub fn classify(path: impl AsRef<Path>) -> Option<MediaKind> {
    let ext = extension(path)?;
    kind_of_extension(&ext)
}

/// Lookup by already-lowercased extension
pub fn kind_of_extension(ext: &str) -> Option<MediaKind> {
    MEDIA_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, kind)| *kind)
}

/// True if the extension needs frame decoding before delivery
pub fn is_preprocessed(ext: &str) -> bool {
    PREPROCESSED_EXTENSIONS.contains(&ext)
}

/// Check that `path` is an existing regular file with a media extension.
///
/// With `wanted` set, the classified kind must match exactly.
pub fn is_media_file(path: &Path, wanted: Option<MediaKind>) -> bool {
    if !path.is_file() {
        return false;
    }
    match (classify(path), wanted) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(kind), Some(wanted)) => kind == wanted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: Extension lookup ignores case
    /// Validates: PNG, png and Png classify the same
    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("photo.PNG"), Some(MediaKind::Image));
        assert_eq!(classify("photo.png"), Some(MediaKind::Image));
        assert_eq!(classify("clip.MoV"), Some(MediaKind::Video));
        assert_eq!(classify("song.Mp3"), Some(MediaKind::Audio));
    }

    /// Test: Directory prefix doesn't affect classification
    /// Validates: Only the file name's last segment counts
    #[test]
    fn test_classify_ignores_prefix() {
        assert_eq!(classify("a/b/c/scan.tif"), classify("scan.tif"));
        assert_eq!(classify("/abs/dir.mp4/notes"), None);
        assert_eq!(classify("archive.tar.gz"), None);
        assert_eq!(classify("README"), None);
    }

    /// Test: Hidden-style names still have an extension
    /// Validates: ".png" counts as png (last dot segment)
    #[test]
    fn test_extension_of_dotfile() {
        assert_eq!(extension(".png").as_deref(), Some("png"));
        assert_eq!(extension("dir/x.TIFF").as_deref(), Some("tiff"));
        assert_eq!(extension("noext"), None);
    }

    #[test]
    fn test_preprocessed_set() {
        assert!(is_preprocessed("tif"));
        assert!(is_preprocessed("tiff"));
        assert!(!is_preprocessed("png"));
        assert!(!is_preprocessed("jpg"));
    }

    /// Test: is_media_file requires an existing regular file
    /// Validates: Directories and missing files are rejected, kind filter works
    #[test]
    fn test_is_media_file() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("a.png");
        let song = dir.path().join("b.wav");
        let fake_dir = dir.path().join("c.jpg");
        std::fs::write(&img, b"x").unwrap();
        std::fs::write(&song, b"x").unwrap();
        std::fs::create_dir(&fake_dir).unwrap();

        assert!(is_media_file(&img, None));
        assert!(is_media_file(&img, Some(MediaKind::Image)));
        assert!(!is_media_file(&img, Some(MediaKind::Audio)));
        assert!(is_media_file(&song, Some(MediaKind::Audio)));
        assert!(!is_media_file(&fake_dir, None));
        assert!(!is_media_file(&dir.path().join("missing.png"), None));
    }

    #[test]
    fn test_extensions_json() {
        let map: BTreeMap<String, String> = serde_json::from_str(&EXTENSIONS_JSON).unwrap();
        assert_eq!(map.get("tiff").map(String::as_str), Some("IMAGE"));
        assert_eq!(map.get("webm").map(String::as_str), Some("VIDEO"));
        assert_eq!(map.get("aac").map(String::as_str), Some("AUDIO"));
        assert_eq!(map.len(), MEDIA_EXTENSIONS.len());
    }
}
