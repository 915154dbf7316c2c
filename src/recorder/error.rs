//! Recording errors

use thiserror::Error;

/// Errors surfaced by the recording lifecycle
///
/// Per-frame failures never show up here; dropped frames are counted, not
/// reported.
#[derive(Error, Debug)]
pub enum RecordingError {
    /// Bad input or a track the writer will not accept
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A recording session is already active")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Writer failed to start: {0}")]
    WriterStartFailed(String),

    #[error("Writer failed to finish: {0}")]
    WriterFinishFailed(String),

    /// The session was finalized before any sample was appended
    #[error("No samples were recorded")]
    NoSamples,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordingError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RecordingError::Configuration(_) | RecordingError::AlreadyRecording => {
                "CONFIGURATION_ERROR"
            }
            RecordingError::NotRecording => "NOT_RECORDING",
            RecordingError::WriterStartFailed(_) => "WRITER_START_FAILED",
            RecordingError::WriterFinishFailed(_) => "WRITER_FINISH_FAILED",
            RecordingError::NoSamples => "NO_SAMPLES",
            RecordingError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether this error is the caller's fault and happened before any side effect
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RecordingError::Configuration(_) | RecordingError::AlreadyRecording
        )
    }
}

pub type RecordingResult<T> = Result<T, RecordingError>;
