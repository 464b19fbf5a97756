use serde::Deserialize;

use crate::session_management::session::FrameGeometry;

/// Geometry of the screen frames requested from the platform.
#[derive(Debug, PartialEq, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    pub density: u32,
    /// Extra bytes per row emitted by the synthetic screen
    pub row_padding: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 2400,
            density: 420,
            row_padding: 0,
        }
    }
}

impl From<ScreenConfig> for FrameGeometry {
    fn from(screen: ScreenConfig) -> Self {
        FrameGeometry {
            width: screen.width,
            height: screen.height,
            density: screen.density,
        }
    }
}
