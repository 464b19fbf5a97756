//! PNG encoding of captured frames.
//!
//! PNG is lossless, so the quality factor is applied before encoding: below 100 every colour
//! channel keeps only its `2 + quality * 6 / 100` most significant bits. Fewer distinct
//! values compress much better, which is the point of a low quality setting.

use std::borrow::Cow;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error_handling::types::CaptureError;

pub const MAX_QUALITY: u8 = 100;

/// Significant bits kept per colour channel for `quality`.
pub fn channel_bits(quality: u8) -> u32 {
    2 + u32::from(quality.min(MAX_QUALITY)) * 6 / u32::from(MAX_QUALITY)
}

fn quantize(pixels: &[u8], quality: u8) -> Cow<'_, [u8]> {
    let bits = channel_bits(quality);
    if bits >= 8 {
        return Cow::Borrowed(pixels);
    }
    let mask = 0xFFu8 << (8 - bits);
    let mut out = pixels.to_vec();
    for px in out.chunks_exact_mut(4) {
        px[0] &= mask;
        px[1] &= mask;
        px[2] &= mask;
    }
    Cow::Owned(out)
}

pub fn encode_png(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let pixels = quantize(image.as_raw(), quality);
    let compression = if quality < 50 {
        CompressionType::Best
    } else {
        CompressionType::Default
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive).write_image(
        &pixels,
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}
