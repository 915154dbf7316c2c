//! User settings persisted across launches

pub mod flags;

pub use flags::{FlagStore, OnboardingFlag};

use thiserror::Error;

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to save settings: {0}")]
    Persist(#[from] tempfile::PersistError),
}
