//! Recording pipeline
//!
//! This module implements the recording lifecycle:
//! - RecordingCoordinator for start/stop and sample routing
//! - A serial recording queue owning the container write session
//! - Overlay compositing of video frames

pub mod compositor;
pub mod coordinator;
pub mod error;
mod queue;
pub mod state;

pub use compositor::composite;
pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use error::{RecordingError, RecordingResult};
pub use state::{
    FrameSize, RecorderStatus, RecordingOutput, RecordingPhase, RecordingSession, RecordingStats,
    WriterStatus,
};
