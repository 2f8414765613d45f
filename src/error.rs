//! Error types for the preview pipeline and API argument binding
//!
//! Neither type crosses back to the HTTP layer: the pipeline turns a
//! `PreviewError` into "no preview" (404), the API turns a `BindError` into
//! a BadRequest carrying the operation's help text.

use std::path::PathBuf;

/// Preview generation errors
#[derive(Debug)]
pub enum PreviewError {
    /// Filesystem error opening or reading the source
    Io(std::io::Error),
    /// Source bytes could not be decoded into frames
    Decode(String),
    /// Frame could not be re-encoded to the delivery format
    Encode(String),
    /// Pixel layout the pipeline doesn't handle
    UnsupportedFormat(String),
    /// Requested frame index outside `[0, frame_count)`
    FrameOutOfRange { index: i64, count: usize },
    /// No frame decoder in this build / runtime
    DecoderUnavailable,
    /// Source is not an image, or doesn't exist
    NotAnImage(PathBuf),
}

impl std::fmt::Display for PreviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewError::Io(e) => write!(f, "IO error: {}", e),
            PreviewError::Decode(e) => write!(f, "Decode error: {}", e),
            PreviewError::Encode(e) => write!(f, "Encode error: {}", e),
            PreviewError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            PreviewError::FrameOutOfRange { index, count } => {
                write!(f, "Frame {} out of range (0..{})", index, count)
            }
            PreviewError::DecoderUnavailable => write!(f, "Frame decoder not available"),
            PreviewError::NotAnImage(p) => write!(f, "Not an image file: {}", p.display()),
        }
    }
}

impl std::error::Error for PreviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreviewError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PreviewError {
    fn from(e: std::io::Error) -> Self {
        PreviewError::Io(e)
    }
}

/// Keyword arguments couldn't be bound to an API operation's parameters
#[derive(Debug)]
pub struct BindError(pub String);

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid arguments: {}", self.0)
    }
}

impl std::error::Error for BindError {}

impl From<serde_json::Error> for BindError {
    fn from(e: serde_json::Error) -> Self {
        BindError(e.to_string())
    }
}
