pub mod encoder;
pub mod frame_source;
pub mod recorder;
pub mod types;

pub use frame_source::{FrameSource, ScreenProvider, SyntheticScreen};
pub use recorder::{capture_once, CaptureLoop, DEFAULT_CAPTURE_INTERVAL};
pub use types::Frame;
