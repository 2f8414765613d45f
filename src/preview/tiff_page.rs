//! One TIFF page to one `Frame`
//!
//! The `tiff` crate hands back raw samples in whatever colour model and
//! sample type the page was written with. Everything is normalized to gray,
//! gray+alpha, RGB or RGBA with 8- or 16-bit samples:
//!
//! | Page                    | Frame                                 |
//! |-------------------------|---------------------------------------|
//! | Gray / GrayA / RGB / RGBA | as-is                               |
//! | CMYK                    | RGB, `(255 - c) * (255 - k) / 255`    |
//! | YCbCr                   | RGB (JFIF full range)                 |
//! | Palette                 | RGB through the ColorMap tag          |
//!
//! Sample types: u8/u16 kept, wider unsigned keep their top 8 bits,
//! floats are clamped to `0..=1` and scaled to 255, signed negatives clamp to 0.

use std::io::{Read, Seek};

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use super::frame::{Frame, Samples};
use crate::error::PreviewError;

/// TIFF Compression tag values for JPEG-in-TIFF (new and old style)
const COMPRESSION_JPEG: [u16; 2] = [7, 6];

/// Decode the page the decoder currently points at
pub fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Frame, PreviewError> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| PreviewError::Decode(format!("Failed to get dimensions: {}", e)))?;
    let color_type = decoder
        .colortype()
        .map_err(|e| PreviewError::Decode(format!("Failed to get color type: {}", e)))?;
    // jpeg-decoder already turns JPEG-compressed YCbCr into RGB
    let jpeg_compressed = decoder
        .find_tag_unsigned::<u16>(Tag::Compression)
        .ok()
        .flatten()
        .is_some_and(|c| COMPRESSION_JPEG.contains(&c));

    let result = decoder
        .read_image()
        .map_err(|e| PreviewError::Decode(format!("Failed to decode page: {}", e)))?;

    match color_type {
        ColorType::Gray(_) => Frame::new(width, height, 1, narrow(result)),
        ColorType::GrayA(_) => Frame::new(width, height, 2, narrow(result)),
        ColorType::RGB(_) => Frame::new(width, height, 3, narrow(result)),
        ColorType::RGBA(_) => Frame::new(width, height, 4, narrow(result)),
        ColorType::CMYK(_) => {
            let rgb = cmyk_to_rgb(&to_u8(narrow(result)))?;
            Frame::new(width, height, 3, Samples::U8(rgb))
        }
        ColorType::YCbCr(_) if jpeg_compressed => Frame::new(width, height, 3, narrow(result)),
        ColorType::YCbCr(_) => {
            let rgb = ycbcr_to_rgb(&to_u8(narrow(result)))?;
            Frame::new(width, height, 3, Samples::U8(rgb))
        }
        ColorType::Palette(_) => {
            let colormap = decoder
                .get_tag_u16_vec(Tag::ColorMap)
                .map_err(|e| PreviewError::Decode(format!("Palette page without ColorMap: {}", e)))?;
            let rgb = expand_palette(&indices(result)?, &colormap)?;
            Frame::new(width, height, 3, Samples::U8(rgb))
        }
        other => Err(PreviewError::UnsupportedFormat(format!("TIFF {:?}", other))),
    }
}

/// Number of pages, found by walking the IFD chain without decoding pixels
pub fn count_pages<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize, PreviewError> {
    let mut pages = 1;
    while decoder.more_images() {
        decoder
            .next_image()
            .map_err(|e| PreviewError::Decode(format!("Failed to seek to page {}: {}", pages, e)))?;
        pages += 1;
    }
    Ok(pages)
}

/// Bring any sample type down to u8 or u16
fn narrow(result: DecodingResult) -> Samples {
    match result {
        DecodingResult::U8(v) => Samples::U8(v),
        DecodingResult::U16(v) => Samples::U16(v),
        DecodingResult::U32(v) => Samples::U8(v.into_iter().map(|s| (s >> 24) as u8).collect()),
        DecodingResult::U64(v) => Samples::U8(v.into_iter().map(|s| (s >> 56) as u8).collect()),
        DecodingResult::F32(v) => Samples::U8(v.into_iter().map(|s| unit_to_u8(s as f64)).collect()),
        DecodingResult::F64(v) => Samples::U8(v.into_iter().map(unit_to_u8).collect()),
        DecodingResult::I8(v) => Samples::U8(v.into_iter().map(|s| (s.max(0) as u8) << 1).collect()),
        DecodingResult::I16(v) => Samples::U16(v.into_iter().map(|s| (s.max(0) as u16) << 1).collect()),
        DecodingResult::I32(v) => Samples::U8(v.into_iter().map(|s| (s.max(0) >> 23) as u8).collect()),
        DecodingResult::I64(v) => Samples::U8(v.into_iter().map(|s| (s.max(0) >> 55) as u8).collect()),
    }
}

fn unit_to_u8(s: f64) -> u8 {
    if s.is_nan() {
        return 0;
    }
    (s.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_u8(samples: Samples) -> Vec<u8> {
    match samples {
        Samples::U8(v) => v,
        Samples::U16(v) => v.into_iter().map(|s| (s >> 8) as u8).collect(),
    }
}

fn cmyk_to_rgb(data: &[u8]) -> Result<Vec<u8>, PreviewError> {
    if data.len() % 4 != 0 {
        return Err(PreviewError::Decode(format!("CMYK buffer of {} samples", data.len())));
    }
    Ok(data
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            [px[0], px[1], px[2]].map(|c| ((255 - c as u32) * k / 255) as u8)
        })
        .collect())
}

fn ycbcr_to_rgb(data: &[u8]) -> Result<Vec<u8>, PreviewError> {
    if data.len() % 3 != 0 {
        return Err(PreviewError::Decode(format!("YCbCr buffer of {} samples", data.len())));
    }
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Ok(data
        .chunks_exact(3)
        .flat_map(|px| {
            let y = px[0] as f32;
            let cb = px[1] as f32 - 128.0;
            let cr = px[2] as f32 - 128.0;
            [
                clamp(y + 1.402 * cr),
                clamp(y - 0.344_136 * cb - 0.714_136 * cr),
                clamp(y + 1.772 * cb),
            ]
        })
        .collect())
}

fn indices(result: DecodingResult) -> Result<Vec<usize>, PreviewError> {
    match result {
        DecodingResult::U8(v) => Ok(v.into_iter().map(usize::from).collect()),
        DecodingResult::U16(v) => Ok(v.into_iter().map(usize::from).collect()),
        _ => Err(PreviewError::UnsupportedFormat("palette index wider than 16 bits".to_string())),
    }
}

/// Look up each index in a TIFF ColorMap: all reds, then all greens, then all blues
fn expand_palette(indices: &[usize], colormap: &[u16]) -> Result<Vec<u8>, PreviewError> {
    if colormap.is_empty() || colormap.len() % 3 != 0 {
        return Err(PreviewError::Decode(format!("ColorMap of {} entries", colormap.len())));
    }
    let size = colormap.len() / 3;
    let mut out = Vec::with_capacity(indices.len() * 3);
    for &i in indices {
        if i >= size {
            return Err(PreviewError::Decode(format!("Palette index {} outside {} colors", i, size)));
        }
        out.extend([colormap[i], colormap[size + i], colormap[2 * size + i]].map(|c| (c >> 8) as u8));
    }
    Ok(out)
}
