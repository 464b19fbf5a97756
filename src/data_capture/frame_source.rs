//! Seams towards the platform screen.
//!
//! A [`ScreenProvider`] checks a capture session and hands out a [`FrameSource`] bound to the
//! session geometry. The frame source is polled once per tick and must never block: when no
//! new frame is ready it returns `Ok(None)` and the tick is skipped.
//!
//! [`SyntheticScreen`] is a provider that renders a moving test pattern, so the pipeline runs
//! on hosts without a platform capture backend.

use log::debug;

use crate::error_handling::types::{AuthorizationError, CaptureError};
use crate::session_management::session::{CaptureSession, FrameGeometry};

use super::types::{Frame, RGBA_PIXEL_STRIDE};

pub trait FrameSource: Send {
    /// Returns the most recent frame, or `None` if no frame is ready yet.
    fn acquire_latest_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

pub trait ScreenProvider: Send + Sync {
    /// Allocates a frame source for `session`, refusing sessions it does not accept.
    fn open(&self, session: &CaptureSession) -> Result<Box<dyn FrameSource>, AuthorizationError>;
}

/// Test-pattern screen.
#[derive(Debug, Clone, Default)]
pub struct SyntheticScreen {
    /// Extra bytes appended to every row, mimicking hardware buffer alignment.
    pub row_padding: usize,
}

impl SyntheticScreen {
    pub fn new(row_padding: usize) -> Self {
        Self { row_padding }
    }
}

impl ScreenProvider for SyntheticScreen {
    fn open(&self, session: &CaptureSession) -> Result<Box<dyn FrameSource>, AuthorizationError> {
        session.validate()?;
        debug!(
            "[{}] Synthetic screen opened at {}x{} ({} dpi)",
            session.id, session.geometry.width, session.geometry.height, session.geometry.density
        );
        Ok(Box::new(SyntheticFrameSource {
            geometry: session.geometry,
            row_padding: self.row_padding,
            frame_index: 0,
        }))
    }
}

struct SyntheticFrameSource {
    geometry: FrameGeometry,
    row_padding: usize,
    frame_index: u32,
}

impl FrameSource for SyntheticFrameSource {
    fn acquire_latest_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let width = self.geometry.width as usize;
        let height = self.geometry.height as usize;
        let row_stride = width * RGBA_PIXEL_STRIDE + self.row_padding;

        // Diagonal gradient with a horizontal band that moves every frame.
        let band_height = (height / 8).max(1);
        let band_top = (self.frame_index as usize * band_height) % height;
        let mut data = vec![0u8; row_stride * height];
        for (y, row) in data.chunks_exact_mut(row_stride).enumerate() {
            let in_band = y >= band_top && y < band_top + band_height;
            for (x, px) in row[..width * RGBA_PIXEL_STRIDE]
                .chunks_exact_mut(RGBA_PIXEL_STRIDE)
                .enumerate()
            {
                let shade = ((x + y) * 255 / (width + height).max(1)) as u8;
                px.copy_from_slice(&if in_band {
                    [255, 255 - shade, 0, 255]
                } else {
                    [shade, 64, 255 - shade, 255]
                });
            }
        }
        self.frame_index = self.frame_index.wrapping_add(1);

        Ok(Some(Frame {
            width: self.geometry.width,
            height: self.geometry.height,
            pixel_stride: RGBA_PIXEL_STRIDE,
            row_stride,
            data,
        }))
    }
}
