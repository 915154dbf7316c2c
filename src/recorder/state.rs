//! Recording state management
//!
//! Defines the recording state machine and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle phase of the recorder
///
/// `Idle → Writing → Finishing → Idle` on success,
/// `Idle → Writing → Failed → Idle` when finalization fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingPhase {
    /// No recording in progress
    Idle,
    /// Accepting samples
    Writing,
    /// Finalizing the output file
    Finishing,
    /// Finalization failed; about to return to idle
    Failed,
}

impl Default for RecordingPhase {
    fn default() -> Self {
        Self::Idle
    }
}

/// State of a container write session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterStatus {
    Unconfigured,
    Writing,
    Finishing,
    Completed,
    Failed,
}

/// Requested video frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One in-progress or completed capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: Uuid,

    /// Output file for this session
    pub output_path: PathBuf,

    pub frame_size: FrameSize,

    pub created_at: DateTime<Utc>,

    pub phase: RecordingPhase,

    /// Capture time of the first written sample
    pub time_origin: Option<Duration>,
}

impl RecordingSession {
    /// Create a new session in the writing phase
    pub fn new(output_path: PathBuf, frame_size: FrameSize) -> Self {
        Self {
            id: Uuid::new_v4(),
            output_path,
            frame_size,
            created_at: Utc::now(),
            phase: RecordingPhase::Writing,
            time_origin: None,
        }
    }

    /// Wall-clock time since the session was created
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }
}

/// Recorder status published to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub phase: RecordingPhase,
    pub is_recording: bool,
    pub output_path: Option<PathBuf>,
}

/// Sample counters for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStats {
    pub video_appended: u64,
    pub audio_appended: u64,
    pub video_dropped: u64,
    pub audio_dropped: u64,
}

impl RecordingStats {
    pub fn dropped(&self) -> u64 {
        self.video_dropped + self.audio_dropped
    }
}

/// Result of a completed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOutput {
    /// Path to the finished container file
    pub output_path: PathBuf,

    pub frame_size: FrameSize,

    /// Wall-clock time between start and finalization
    pub elapsed_ms: i64,

    pub stats: RecordingStats,
}
