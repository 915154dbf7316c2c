//! Capture trait definitions
//!
//! Platform-agnostic traits for camera and microphone sources.

use crate::media::{AudioSample, VideoFrame};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture device not found: {0}")]
    DeviceNotFound(String),

    #[error("Capture is already running")]
    AlreadyRunning,

    #[error("Capture is not running")]
    NotRunning,

    #[error("Unsupported capture mode: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which side of the device a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Back,
    Front,
}

impl CameraPosition {
    pub fn flipped(&self) -> Self {
        match self {
            CameraPosition::Back => CameraPosition::Front,
            CameraPosition::Front => CameraPosition::Back,
        }
    }
}

/// Single camera or both at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Single,
    /// Back camera full frame with the front camera inset
    Dual,
}

/// Information about a camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    pub position: CameraPosition,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Whether this is the default device
    pub is_default: bool,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Called on the video capture thread for every frame
pub type VideoHandler = Arc<dyn Fn(VideoFrame, Duration) + Send + Sync>;

/// Called on the audio capture thread for every PCM chunk
pub type AudioHandler = Arc<dyn Fn(AudioSample, Duration) + Send + Sync>;

/// A camera + microphone source
///
/// Handlers are registered once at setup and invoked from dedicated capture
/// threads (one per media type) with the capture clock timestamp. They must
/// return quickly.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Get the source ID
    fn id(&self) -> &str;

    fn cameras(&self) -> Vec<CameraInfo>;

    fn microphones(&self) -> Vec<AudioDeviceInfo>;

    /// Whether both cameras can run at the same time
    fn supports_dual_capture(&self) -> bool;

    fn set_video_handler(&self, handler: VideoHandler);

    fn set_audio_handler(&self, handler: AudioHandler);

    /// Start delivering frames
    async fn start(&self, mode: CaptureMode) -> Result<(), CaptureError>;

    /// Stop delivering frames
    async fn stop(&self) -> Result<(), CaptureError>;

    /// Swap the active camera in single mode, returning the new one
    fn switch_camera(&self) -> Result<CameraPosition, CaptureError>;
}
