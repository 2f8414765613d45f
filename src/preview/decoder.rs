//! Frame decoders with pluggable backends
//!
//! Unified interface for turning an image file into its list of frames.
//! Backend is chosen once at startup:
//! - Feature "preview" (default): `tiff` crate for multi-page TIFF, `image` crate for the rest
//! - Otherwise, or with `--no-preview`: passthrough, originals are served unprocessed

#[cfg(feature = "preview")]
use std::fs::File;
#[cfg(feature = "preview")]
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use super::frame::Frame;
#[cfg(feature = "preview")]
use super::tiff_page;
use crate::error::PreviewError;

/// Notice printed when the gallery runs without frame decoding
pub const DECODER_MISSING_MSG: &str = "Frame decoding is disabled, so TIFF files are served as-is and \
     most browsers won't display them. Rebuild with the default \"preview\" feature \
     (and drop --no-preview) to get resized previews.";

/// Decodes every frame of an image file
pub trait FrameDecoder: Send + Sync {
    /// Backend name for logs and `--version`
    fn name(&self) -> &'static str;

    /// False for the passthrough backend: callers serve the original bytes instead
    fn is_available(&self) -> bool {
        true
    }

    /// Decode all frames. A single-image format yields one frame.
    fn decode_frames(&self, path: &Path) -> Result<Vec<Frame>, PreviewError>;

    /// Number of decodable frames, 1 when decoding fails for any reason
    fn count_frames(&self, path: &Path) -> usize {
        match self.decode_frames(path) {
            Ok(frames) if !frames.is_empty() => frames.len(),
            Ok(_) => 1,
            Err(e) => {
                debug!("Frame count fallback for {}: {}", path.display(), e);
                1
            }
        }
    }
}

/// Which decoder backend to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderChoice {
    Full,
    Passthrough,
}

impl DecoderChoice {
    /// Full when compiled in and not disabled by the user
    pub fn detect(disabled: bool) -> Self {
        if cfg!(feature = "preview") && !disabled {
            DecoderChoice::Full
        } else {
            DecoderChoice::Passthrough
        }
    }

    /// Build the backend. Warns once here when previews are unavailable.
    pub fn build(self) -> Arc<dyn FrameDecoder> {
        match self {
            #[cfg(feature = "preview")]
            DecoderChoice::Full => Arc::new(TiffDecoder),
            #[cfg(not(feature = "preview"))]
            DecoderChoice::Full => {
                warn!("{}", DECODER_MISSING_MSG);
                Arc::new(PassthroughDecoder)
            }
            DecoderChoice::Passthrough => {
                warn!("{}", DECODER_MISSING_MSG);
                Arc::new(PassthroughDecoder)
            }
        }
    }
}

/// Decoder that never decodes
pub struct PassthroughDecoder;

impl FrameDecoder for PassthroughDecoder {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn decode_frames(&self, _path: &Path) -> Result<Vec<Frame>, PreviewError> {
        Err(PreviewError::DecoderUnavailable)
    }
}

/// Multi-page TIFF via `tiff`, everything else via `image`
#[cfg(feature = "preview")]
pub struct TiffDecoder;

#[cfg(feature = "preview")]
impl FrameDecoder for TiffDecoder {
    fn name(&self) -> &'static str {
        "tiff + image"
    }

    fn decode_frames(&self, path: &Path) -> Result<Vec<Frame>, PreviewError> {
        let ext = crate::media::extension(path).unwrap_or_default();
        if crate::media::is_preprocessed(&ext) {
            Self::decode_tiff(path)
        } else {
            Self::decode_generic(path)
        }
    }

    /// Pages of a TIFF without decoding pixels; other images are one frame
    fn count_frames(&self, path: &Path) -> usize {
        let ext = crate::media::extension(path).unwrap_or_default();
        if !crate::media::is_preprocessed(&ext) {
            return 1;
        }
        match Self::open_tiff(path).and_then(|mut decoder| tiff_page::count_pages(&mut decoder)) {
            Ok(pages) => pages,
            Err(e) => {
                debug!("Frame count fallback for {}: {}", path.display(), e);
                1
            }
        }
    }
}

#[cfg(feature = "preview")]
impl TiffDecoder {
    fn open_tiff(path: &Path) -> Result<tiff::decoder::Decoder<BufReader<File>>, PreviewError> {
        let file = File::open(path)?;
        tiff::decoder::Decoder::new(BufReader::new(file))
            .map_err(|e| PreviewError::Decode(format!("Failed to create TIFF decoder: {}", e)))
    }

    fn decode_tiff(path: &Path) -> Result<Vec<Frame>, PreviewError> {
        debug!("Decoding TIFF pages: {}", path.display());

        let mut decoder = Self::open_tiff(path)?;

        let mut frames = Vec::new();
        loop {
            frames.push(tiff_page::read_page(&mut decoder)?);
            if !decoder.more_images() {
                break;
            }
            decoder
                .next_image()
                .map_err(|e| PreviewError::Decode(format!("Failed to seek to page {}: {}", frames.len(), e)))?;
        }

        debug!("{}: {} page(s)", path.display(), frames.len());
        Ok(frames)
    }

    fn decode_generic(path: &Path) -> Result<Vec<Frame>, PreviewError> {
        debug!("Decoding image: {}", path.display());

        let img = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| PreviewError::Decode(format!("Image decode error: {}", e)))?;

        Ok(vec![Frame::from_dynamic(img)?])
    }
}
