//! Container writing
//!
//! A [`ContainerWriter`] multiplexes an audio and a video sample stream into
//! one file. [`WriteSession`] wraps a writer with the configure → start →
//! append → finish lifecycle and the timestamp rules every backend relies on.

pub mod ffmpeg;
pub mod memory;
pub mod session;

use crate::media::{AudioSample, MediaKind, PixelFormat, VideoFrame};
use crate::recorder::error::RecordingResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub use ffmpeg::{FfmpegWriter, FfmpegWriterFactory};
pub use memory::{MemoryWriterFactory, MemoryWriterOptions, RecordingManifest};
pub use session::{AppendOutcome, DropReason, WriteSession};

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Mov,
    Mkv,
}

impl ContainerFormat {
    /// File extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "mkv",
        }
    }

    /// FFmpeg muxer name
    pub fn muxer(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "matroska",
        }
    }
}

impl Default for ContainerFormat {
    fn default() -> Self {
        Self::Mp4
    }
}

/// Video track configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrackSettings {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// Average bitrate in bits per second
    pub bitrate: u32,
    pub fps: u32,
    pub profile: Option<String>,
    /// Layout of the frames that will be appended
    pub pixel_format: PixelFormat,
}

impl VideoTrackSettings {
    /// Nominal duration of one frame
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

/// Audio track configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrackSettings {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bitrate in bits per second
    pub bitrate: u32,
}

/// Everything a writer needs to set up both tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterSettings {
    pub container: ContainerFormat,
    pub video: VideoTrackSettings,
    pub audio: AudioTrackSettings,
}

/// A muxer backend
///
/// Implementations are driven from a single thread (the recording queue) and
/// may block inside `finish`. Timestamps passed to the append methods are
/// already relative to the session time origin and strictly increasing per
/// track.
pub trait ContainerWriter: Send {
    /// Add the video track; fails with a configuration error if rejected
    fn add_video_track(&mut self, settings: &VideoTrackSettings) -> RecordingResult<()>;

    /// Add the audio track; fails with a configuration error if rejected
    fn add_audio_track(&mut self, settings: &AudioTrackSettings) -> RecordingResult<()>;

    /// Open the output target and begin accepting samples
    fn start(&mut self) -> RecordingResult<()>;

    /// Whether the given track can take another sample right now
    fn is_ready_for_more(&self, _kind: MediaKind) -> bool {
        true
    }

    fn append_video(&mut self, frame: &VideoFrame, pts: Duration) -> RecordingResult<()>;

    fn append_audio(&mut self, sample: &AudioSample, pts: Duration) -> RecordingResult<()>;

    /// No more samples will arrive on this track
    fn mark_finished(&mut self, kind: MediaKind);

    /// Finalize the output file
    fn finish(&mut self) -> RecordingResult<()>;

    /// Discard whatever was written so far
    fn abort(&mut self) {}
}

/// Creates a writer for a given output path
pub trait WriterFactory: Send + Sync {
    fn create(&self, target: &Path) -> RecordingResult<Box<dyn ContainerWriter>>;
}
