//! Decoded image frame with 8- or 16-bit samples
//!
//! **Why**: TIFF pages arrive as raw interleaved sample buffers of varying
//! depth and channel count. The preview pipeline needs three operations on
//! them: row/column subsampling, 16→8 bit reduction, JPEG encoding.
//!
//! # Pixel Layout
//!
//! Samples are interleaved, row-major: `(y * width + x) * channels + c`.
//! Channel count is 1 (gray), 2 (gray+alpha), 3 (RGB) or 4 (RGBA).

use std::io::Write;

use image::DynamicImage;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::error::PreviewError;

/// JPEG quality for generated previews
pub const JPEG_QUALITY: u8 = 90;

/// Sample buffer - stores different bit depths
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
        }
    }
}

/// Single decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    samples: Samples,
}

impl Frame {
    /// Wrap a sample buffer, checking that its length matches the dimensions
    pub fn new(width: u32, height: u32, channels: u8, samples: Samples) -> Result<Self, PreviewError> {
        if !(1..=4).contains(&channels) {
            return Err(PreviewError::UnsupportedFormat(format!("{} channels", channels)));
        }
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(PreviewError::Decode(format!(
                "buffer holds {} samples, {}x{}x{} needs {}",
                samples.len(),
                width,
                height,
                channels,
                expected
            )));
        }
        Ok(Self { width, height, channels, samples })
    }

    /// Convert an `image` crate decode result, keeping 16-bit depth when present
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, PreviewError> {
        let (width, height) = (img.width(), img.height());
        let (channels, samples) = match img {
            DynamicImage::ImageLuma8(b) => (1, Samples::U8(b.into_raw())),
            DynamicImage::ImageLumaA8(b) => (2, Samples::U8(b.into_raw())),
            DynamicImage::ImageRgb8(b) => (3, Samples::U8(b.into_raw())),
            DynamicImage::ImageRgba8(b) => (4, Samples::U8(b.into_raw())),
            DynamicImage::ImageLuma16(b) => (1, Samples::U16(b.into_raw())),
            DynamicImage::ImageLumaA16(b) => (2, Samples::U16(b.into_raw())),
            DynamicImage::ImageRgb16(b) => (3, Samples::U16(b.into_raw())),
            DynamicImage::ImageRgba16(b) => (4, Samples::U16(b.into_raw())),
            // Float and future variants
            other => (4, Samples::U16(other.to_rgba16().into_raw())),
        };
        Self::new(width, height, channels, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Keep every `factor`-th row and column, starting from the first.
    ///
    /// Channels are untouched. Resulting size is `ceil(dim / factor)`.
    pub fn subsample(&self, factor: u32) -> Frame {
        let factor = factor.max(1);
        if factor == 1 {
            return self.clone();
        }
        let out_w = self.width.div_ceil(factor);
        let out_h = self.height.div_ceil(factor);
        let samples = match &self.samples {
            Samples::U8(v) => Samples::U8(subsample_plane(v, self.width, self.height, self.channels, factor)),
            Samples::U16(v) => Samples::U16(subsample_plane(v, self.width, self.height, self.channels, factor)),
        };
        Frame {
            width: out_w,
            height: out_h,
            channels: self.channels,
            samples,
        }
    }

    /// Narrow to 8-bit. 16-bit samples are shifted right by 8, not rescaled.
    pub fn into_u8(self) -> Frame {
        match self.samples {
            Samples::U8(_) => self,
            Samples::U16(v) => Frame {
                width: self.width,
                height: self.height,
                channels: self.channels,
                samples: Samples::U8(v.into_iter().map(|s| (s >> 8) as u8).collect()),
            },
        }
    }

    /// Encode as baseline JPEG. Alpha is dropped, 16-bit input is narrowed first.
    pub fn write_jpeg<W: Write>(self, mut writer: W) -> Result<(), PreviewError> {
        let frame = self.into_u8();
        let Samples::U8(data) = &frame.samples else {
            return Err(PreviewError::Encode("expected 8-bit samples".to_string()));
        };

        let (pixels, color) = match frame.channels {
            1 => (data.clone(), ExtendedColorType::L8),
            2 => (data.chunks_exact(2).map(|px| px[0]).collect(), ExtendedColorType::L8),
            3 => (data.clone(), ExtendedColorType::Rgb8),
            _ => (
                data.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect(),
                ExtendedColorType::Rgb8,
            ),
        };

        let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        encoder
            .encode(&pixels, frame.width, frame.height, color)
            .map_err(|e| PreviewError::Encode(format!("JPEG encoding failed: {}", e)))
    }
}

/// Integer subsampling factor so the result stays at least `min_height` tall.
///
/// `floor(height / min_height)`, never below 1.
pub fn subsample_factor(height: u32, min_height: u32) -> u32 {
    (height / min_height.max(1)).max(1)
}

fn subsample_plane<T: Copy>(data: &[T], width: u32, height: u32, channels: u8, factor: u32) -> Vec<T> {
    let (w, c, f) = (width as usize, channels as usize, factor as usize);
    let out_w = w.div_ceil(f);
    let out_h = (height as usize).div_ceil(f);
    let mut out = Vec::with_capacity(out_w * out_h * c);
    for y in (0..height as usize).step_by(f) {
        let row = &data[y * w * c..(y + 1) * w * c];
        for x in (0..w).step_by(f) {
            out.extend_from_slice(&row[x * c..(x + 1) * c]);
        }
    }
    out
}
