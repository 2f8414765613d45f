//! servGallery - super simple media gallery server library
//!
//! Serves a directory tree over HTTP as a browsable gallery: a listing page,
//! a small JSON API for the page script, and on-demand JPEG previews of
//! multi-page TIFF files.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod preview;
pub mod server;

pub use api::{Api, ApiMethod, ApiResult, ApiStatus};
pub use config::ServerConfig;
pub use error::{BindError, PreviewError};
pub use media::{MediaKind, classify, is_media_file};
pub use preview::{Preview, ThumbnailRequest, get_preview};
pub use server::{Router, run_server};
