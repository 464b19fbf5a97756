//! Capture session management.
//!
//! A capture session bundles the authorization handed over by the platform with the
//! geometry of the frames to capture. It lives from the moment capture is granted until the
//! capture loop stops.

/// Submodule for the capture session data structure and its validation.
pub mod session;

pub use session::{CaptureSession, FrameGeometry};
