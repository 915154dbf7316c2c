//! Media primitives shared by capture, compositing and writing

pub mod frame;
pub mod overlay;

pub use frame::{AudioSample, MediaKind, PixelFormat, SampleBuffer, SamplePayload, VideoFrame};
pub use overlay::{OverlayError, OverlayImage};
