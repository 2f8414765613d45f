//! Thumbnail pipeline
//!
//! Turns `(path, min_height, frame_index)` into a byte stream the router can
//! send as-is:
//!
//! ```text
//! not an image / missing ───────────────▶ None (404)
//! browser-native format ────────────────▶ Preview::Original(file)
//! TIFF, no decoder ─────────────────────▶ Preview::Original(file)
//! TIFF ─▶ decode pages to 8/16-bit ─▶ pick frame ─▶ subsample ─▶ >>8 ─▶ JPEG ─▶ Preview::Generated(tempfile)
//! ```
//!
//! A generated preview lives in a `NamedTempFile` owned by the response body.
//! It is deleted when the body is dropped: after the last byte is written,
//! when the client hangs up mid-transfer, or on any error before that.

pub mod decoder;
pub mod frame;
#[cfg(feature = "preview")]
pub mod tiff_page;

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::PreviewError;
use crate::media::{self, MediaKind};
use decoder::FrameDecoder;
use frame::subsample_factor;

pub use decoder::{DecoderChoice, PassthroughDecoder};
pub use frame::{Frame, Samples};

/// Default target height when the query doesn't give one
pub const DEFAULT_MIN_HEIGHT: u32 = 600;

/// Default frame index when the query doesn't give one
pub const DEFAULT_FRAME_INDEX: i64 = -1;

/// Content type of generated previews
pub const PREVIEW_CONTENT_TYPE: &str = "image/jpeg";

/// One thumbnail request, built from query parameters and consumed once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub path: PathBuf,
    /// Always ≥ 1
    pub min_height: u32,
    pub frame_index: i64,
}

impl ThumbnailRequest {
    pub fn new(path: PathBuf, min_height: u32, frame_index: i64) -> Self {
        Self {
            path,
            min_height: min_height.max(1),
            frame_index,
        }
    }
}

/// Preview bytes ready for transfer
#[derive(Debug)]
pub enum Preview {
    /// Source file, unmodified
    Original { file: File, content_type: &'static str },
    /// Re-encoded frame, removed from disk on drop
    Generated(NamedTempFile),
}

impl Preview {
    pub fn content_type(&self) -> &'static str {
        match self {
            Preview::Original { content_type, .. } => content_type,
            Preview::Generated(_) => PREVIEW_CONTENT_TYPE,
        }
    }

    /// Byte length, if the filesystem can tell
    pub fn byte_len(&self) -> Option<usize> {
        let meta = match self {
            Preview::Original { file, .. } => file.metadata(),
            Preview::Generated(tmp) => tmp.as_file().metadata(),
        };
        meta.ok().map(|m| m.len() as usize)
    }

    /// Reader over the preview bytes. Owns the temp file, if any.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Preview::Original { file, .. } => Box::new(file),
            Preview::Generated(tmp) => Box::new(tmp),
        }
    }
}

/// Produce a preview for `request`, or `None` when there is nothing to show.
///
/// Never fails: OS errors, decode errors and out-of-range frames all end up
/// as `None`, which the router answers with 404.
pub fn get_preview(decoder: &dyn FrameDecoder, request: &ThumbnailRequest) -> Option<Preview> {
    match try_preview(decoder, request) {
        Ok(preview) => Some(preview),
        Err(PreviewError::NotAnImage(path)) => {
            debug!("No preview, not an image: {}", path.display());
            None
        }
        Err(e @ PreviewError::Io(_)) | Err(e @ PreviewError::FrameOutOfRange { .. }) => {
            debug!("No preview for {}: {}", request.path.display(), e);
            None
        }
        Err(e) => {
            warn!("Preview failed for {}: {}", request.path.display(), e);
            None
        }
    }
}

fn try_preview(decoder: &dyn FrameDecoder, request: &ThumbnailRequest) -> Result<Preview, PreviewError> {
    let path = request.path.as_path();
    let ext = media::extension(path).unwrap_or_default();
    if media::kind_of_extension(&ext) != Some(MediaKind::Image) || !path.is_file() {
        return Err(PreviewError::NotAnImage(path.to_path_buf()));
    }

    if !media::is_preprocessed(&ext) || !decoder.is_available() {
        return open_original(path, &ext);
    }

    let mut frames = decoder.decode_frames(path)?;
    let count = frames.len();
    let index = usize::try_from(request.frame_index)
        .ok()
        .filter(|i| *i < count)
        .ok_or(PreviewError::FrameOutOfRange {
            index: request.frame_index,
            count,
        })?;
    let frame = frames.swap_remove(index);

    let factor = subsample_factor(frame.height(), request.min_height);
    debug!(
        "Preview {} frame {}: {}x{} / {}",
        path.display(),
        index,
        frame.width(),
        frame.height(),
        factor
    );
    encode_to_tempfile(frame.subsample(factor).into_u8())
}

fn open_original(path: &Path, ext: &str) -> Result<Preview, PreviewError> {
    let file = File::open(path)?;
    Ok(Preview::Original {
        file,
        content_type: image_mime(ext),
    })
}

/// MIME type by extension, falling back to plain `image` for types rouille doesn't know
fn image_mime(ext: &str) -> &'static str {
    match rouille::extension_to_mime(ext) {
        mime if mime.starts_with("image/") => mime,
        _ => "image",
    }
}

/// Encode into a fresh temp file, rewound for reading. The file is gone if this fails.
fn encode_to_tempfile(frame: Frame) -> Result<Preview, PreviewError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("servgallery-")
        .suffix(".jpg")
        .tempfile()?;
    frame.write_jpeg(&mut tmp)?;
    tmp.rewind()?;
    Ok(Preview::Generated(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_all(preview: Preview) -> Vec<u8> {
        let mut out = Vec::new();
        preview.into_reader().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_request_clamps_min_height() {
        let req = ThumbnailRequest::new(PathBuf::from("a.tif"), 0, 0);
        assert_eq!(req.min_height, 1);
    }

    /// Test: Browser-native images are passed through
    /// Validates: Bytes unchanged regardless of min_height
    #[test]
    fn test_native_image_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        std::fs::write(&path, b"not really a png").unwrap();

        for min_height in [1, 50, 600, 10_000] {
            let req = ThumbnailRequest::new(path.clone(), min_height, 0);
            let preview = get_preview(&PassthroughDecoder, &req).unwrap();
            assert_eq!(preview.content_type(), "image/png");
            assert_eq!(read_all(preview), b"not really a png");
        }
    }

    /// Test: Non-images and missing files
    /// Validates: Both yield no preview
    #[test]
    fn test_no_preview_for_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        let video = dir.path().join("clip.mp4");
        std::fs::write(&text, b"hello").unwrap();
        std::fs::write(&video, b"....").unwrap();

        for path in [text, video, dir.path().join("gone.png"), dir.path().to_path_buf()] {
            let req = ThumbnailRequest::new(path, 600, 0);
            assert!(get_preview(&PassthroughDecoder, &req).is_none());
        }
    }

    /// Test: TIFF without a decoder
    /// Validates: Degrades to the original bytes instead of failing
    #[test]
    fn test_tiff_without_decoder_serves_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.tif");
        decoder::tests::write_gray_tiff(&path, 4, 4, 2);
        let original = std::fs::read(&path).unwrap();

        let req = ThumbnailRequest::new(path, 600, 5);
        let preview = get_preview(&PassthroughDecoder, &req).unwrap();
        assert!(matches!(preview, Preview::Original { .. }));
        assert!(preview.content_type().starts_with("image"));
        assert_eq!(read_all(preview), original);
    }

    /// Test: Frame index bounds on a 3-page TIFF
    /// Validates: -1 and 3 give no preview, 0..3 give JPEGs
    #[cfg(feature = "preview")]
    #[test]
    fn test_frame_index_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tiff");
        decoder::tests::write_gray_tiff(&path, 8, 8, 3);
        let decoder = decoder::TiffDecoder;

        for index in [-1, 3, 100] {
            let req = ThumbnailRequest::new(path.clone(), 600, index);
            assert!(get_preview(&decoder, &req).is_none(), "index {}", index);
        }
        for index in 0..3 {
            let req = ThumbnailRequest::new(path.clone(), 600, index);
            let preview = get_preview(&decoder, &req).unwrap();
            assert_eq!(preview.content_type(), PREVIEW_CONTENT_TYPE);
            let bytes = read_all(preview);
            assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        }
    }

    /// Test: Generated preview is subsampled
    /// Validates: 40px tall frame with min_height 10 comes back 10px tall
    #[cfg(feature = "preview")]
    #[test]
    fn test_generated_preview_is_subsampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.tif");
        decoder::tests::write_rgb16_tiff(&path, 20, 40, 0xFF00);

        let req = ThumbnailRequest::new(path, 10, 0);
        let preview = get_preview(&decoder::TiffDecoder, &req).unwrap();
        let img = image::load_from_memory(&read_all(preview)).unwrap();
        assert_eq!((img.width(), img.height()), (5, 10));
    }

    /// Test: CMYK page preview
    /// Validates: Last page of a CMYK stack comes back as a JPEG of the same size
    #[cfg(feature = "preview")]
    #[test]
    fn test_cmyk_tiff_preview() {
        use tiff::encoder::{TiffEncoder, colortype};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("print.tif");
        let mut encoder = TiffEncoder::new(std::fs::File::create(&path).unwrap()).unwrap();
        for _ in 0..2 {
            encoder.write_image::<colortype::CMYK8>(6, 4, &[0; 96]).unwrap();
        }
        drop(encoder);

        let req = ThumbnailRequest::new(path, 600, 1);
        let preview = get_preview(&decoder::TiffDecoder, &req).unwrap();
        let img = image::load_from_memory(&read_all(preview)).unwrap();
        assert_eq!((img.width(), img.height()), (6, 4));
    }

    /// Test: Temp file lifetime
    /// Validates: Generated file exists while held, removed once dropped
    #[cfg(feature = "preview")]
    #[test]
    fn test_generated_preview_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.tif");
        decoder::tests::write_gray_tiff(&path, 4, 4, 1);

        let req = ThumbnailRequest::new(path, 600, 0);
        let preview = get_preview(&decoder::TiffDecoder, &req).unwrap();
        let tmp_path = match &preview {
            Preview::Generated(tmp) => tmp.path().to_path_buf(),
            other => panic!("expected generated preview, got {:?}", other),
        };
        assert!(tmp_path.exists());
        assert!(preview.byte_len().unwrap() > 0);

        let reader = preview.into_reader();
        assert!(tmp_path.exists());
        drop(reader);
        assert!(!tmp_path.exists());
    }
}
