//! Capture sources
//!
//! This module provides the camera/microphone source abstraction and a
//! synthetic source that fabricates both feeds.

pub mod synthetic;
pub mod traits;

pub use synthetic::{SyntheticCamera, SyntheticCameraConfig};
pub use traits::{
    AudioDeviceInfo, AudioHandler, CameraInfo, CameraPosition, CaptureError, CaptureMode,
    CaptureSource, Resolution, VideoHandler,
};
