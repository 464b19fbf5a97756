//! Common data types used across the data_capture subsystem.

use image::RgbaImage;

use crate::error_handling::types::CaptureError;

/// Bytes per pixel of an RGBA_8888 frame.
pub const RGBA_PIXEL_STRIDE: usize = 4;

/// One raw RGBA_8888 frame as handed out by a frame source.
///
/// Hardware buffers are often wider than the visible frame: each row occupies `row_stride`
/// bytes of which only `width * pixel_stride` carry pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Bytes between two horizontally adjacent pixels
    pub pixel_stride: usize,
    /// Bytes between the starts of two consecutive rows, padding included
    pub row_stride: usize,
    pub data: Vec<u8>,
}

impl Frame {
    /// A tightly packed frame.
    pub fn packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixel_stride: RGBA_PIXEL_STRIDE,
            row_stride: width as usize * RGBA_PIXEL_STRIDE,
            data,
        }
    }

    /// Bytes of row padding the hardware appended to each row.
    pub fn row_padding(&self) -> usize {
        self.row_stride
            .saturating_sub(self.width as usize * self.pixel_stride)
    }

    /// Copies the visible pixels into an image, dropping any row padding.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::StrideMismatch(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }
        if self.pixel_stride != RGBA_PIXEL_STRIDE {
            return Err(CaptureError::StrideMismatch(format!(
                "pixel stride {} is not RGBA_8888",
                self.pixel_stride
            )));
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let row_bytes = width * RGBA_PIXEL_STRIDE;
        if self.row_stride < row_bytes {
            return Err(CaptureError::StrideMismatch(format!(
                "row stride {} shorter than a {} pixel row",
                self.row_stride, width
            )));
        }

        // The last row does not need its padding to be present.
        let needed = self.row_stride * (height - 1) + row_bytes;
        if self.data.len() < needed {
            return Err(CaptureError::StrideMismatch(format!(
                "buffer holds {} bytes, {}x{} with stride {} needs {}",
                self.data.len(),
                width,
                height,
                self.row_stride,
                needed
            )));
        }

        let pixels = if self.row_stride == row_bytes {
            self.data[..needed].to_vec()
        } else {
            let mut pixels = Vec::with_capacity(row_bytes * height);
            for row in self.data.chunks(self.row_stride).take(height) {
                pixels.extend_from_slice(&row[..row_bytes]);
            }
            pixels
        };

        RgbaImage::from_raw(self.width, self.height, pixels).ok_or_else(|| {
            CaptureError::StrideMismatch("pixel buffer does not match frame size".to_string())
        })
    }
}
