//! Error types and handling
//!
//! Common error types used across the application.

use crate::capture::CaptureError;
use crate::media::OverlayError;
use crate::recorder::RecordingError;
use crate::settings::SettingsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),
}

/// Error response for presentation layers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Recording(e) => e.code(),
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Settings(_) => "SETTINGS_ERROR",
            AppError::Overlay(_) => "OVERLAY_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
