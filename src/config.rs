//! Recorder configuration
//!
//! Loaded from an optional JSON file; every field has a default so partial
//! files are fine.

use crate::media::PixelFormat;
use crate::recorder::state::FrameSize;
use crate::utils::error::{AppError, AppResult};
use crate::writer::{AudioTrackSettings, ContainerFormat, VideoTrackSettings, WriterSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional functionality switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Live streaming to social platforms; off means local recording only
    pub enable_social_media_streaming: bool,
    /// Record both cameras at once where the device supports it
    pub enable_multi_cam: bool,
    pub enable_charity_prompt: bool,
    pub enable_intro_animation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_social_media_streaming: false,
            enable_multi_cam: true,
            enable_charity_prompt: true,
            enable_intro_animation: true,
        }
    }
}

/// Video encoding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoEncoding {
    pub codec: String,
    /// Average bitrate in bits per second
    pub bitrate: u32,
    pub fps: u32,
    pub profile: Option<String>,
    /// Pixel layout delivered by the camera
    pub pixel_format: PixelFormat,
}

impl Default for VideoEncoding {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            bitrate: 6_000_000,
            fps: 30,
            profile: Some("high".to_string()),
            pixel_format: PixelFormat::Argb,
        }
    }
}

/// Audio encoding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioEncoding {
    pub codec: String,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate: 128_000,
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Top-level recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Where recordings go; the system temp directory when unset
    pub output_dir: Option<PathBuf>,
    /// Where onboarding flags are kept; `output_dir` when unset
    pub state_dir: Option<PathBuf>,
    pub container: ContainerFormat,
    pub video: VideoEncoding,
    pub audio: AudioEncoding,
    /// Samples per track allowed in flight on the recording queue
    pub queue_depth: usize,
    pub ffmpeg_path: PathBuf,
    /// PNG drawn over every frame while the warning is shown
    pub overlay_png: Option<PathBuf>,
    pub features: FeatureFlags,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            state_dir: None,
            container: ContainerFormat::Mp4,
            video: VideoEncoding::default(),
            audio: AudioEncoding::default(),
            queue_depth: 4,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            overlay_png: None,
            features: FeatureFlags::default(),
        }
    }
}

impl RecorderConfig {
    /// Read a JSON config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded recorder config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.video.fps == 0 {
            return Err(AppError::Config("video fps must be positive".to_string()));
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return Err(AppError::Config(
                "audio sample rate and channel count must be positive".to_string(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(AppError::Config("queue depth must be positive".to_string()));
        }
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| self.output_dir())
    }

    /// Writer settings for a recording at `frame_size`
    pub fn writer_settings(&self, frame_size: FrameSize) -> WriterSettings {
        WriterSettings {
            container: self.container,
            video: VideoTrackSettings {
                codec: self.video.codec.clone(),
                width: frame_size.width,
                height: frame_size.height,
                bitrate: self.video.bitrate,
                fps: self.video.fps,
                profile: self.video.profile.clone(),
                pixel_format: self.video.pixel_format,
            },
            audio: AudioTrackSettings {
                codec: self.audio.codec.clone(),
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                bitrate: self.audio.bitrate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.video.bitrate, 6_000_000);
        assert_eq!(config.audio.bitrate, 128_000);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert!(!config.features.enable_social_media_streaming);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "container": "mkv", "video": { "fps": 60 }, "features": { "enableMultiCam": false } }"#,
        )
        .unwrap();

        let config = RecorderConfig::load(&path).unwrap();
        assert_eq!(config.container, ContainerFormat::Mkv);
        assert_eq!(config.video.fps, 60);
        assert_eq!(config.video.codec, "libx264");
        assert!(!config.features.enable_multi_cam);
        assert!(config.features.enable_charity_prompt);
    }

    #[test]
    fn test_load_rejects_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "video": { "fps": 0 } }"#).unwrap();
        assert!(matches!(RecorderConfig::load(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_writer_settings_use_frame_size() {
        let config = RecorderConfig::default();
        let settings = config.writer_settings(FrameSize::new(1920, 1080));
        assert_eq!((settings.video.width, settings.video.height), (1920, 1080));
        assert_eq!(settings.audio.channels, 2);
    }
}
