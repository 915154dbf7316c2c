//! In-memory writer
//!
//! Keeps sample timing in memory and finalizes to a JSON manifest instead of
//! an encoded container. Used for dry runs and for exercising the recording
//! lifecycle without an encoder on the machine.

use super::{AudioTrackSettings, ContainerWriter, VideoTrackSettings, WriterFactory};
use crate::media::{AudioSample, MediaKind, VideoFrame};
use crate::recorder::error::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Behaviour knobs for [`MemoryWriter`]
#[derive(Debug, Clone)]
pub struct MemoryWriterOptions {
    /// Cleared to simulate a writer that cannot take more data
    pub ready: Arc<AtomicBool>,
    pub reject_video: bool,
    pub reject_audio: bool,
    pub fail_start: bool,
    pub fail_finish: bool,
    /// Time spent in every append, to emulate a slow encoder
    pub append_delay: Duration,
}

impl Default for MemoryWriterOptions {
    fn default() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
            reject_video: false,
            reject_audio: false,
            fail_start: false,
            fail_finish: false,
            append_delay: Duration::ZERO,
        }
    }
}

/// Summary written to the output path on finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingManifest {
    pub width: u32,
    pub height: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub video_frames: u64,
    /// Total PCM sample frames
    pub audio_frames: u64,
    pub duration_ms: f64,
}

impl RecordingManifest {
    pub fn read(path: &Path) -> RecordingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RecordingError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Creates [`MemoryWriter`]s sharing one set of options
#[derive(Debug, Clone, Default)]
pub struct MemoryWriterFactory {
    options: MemoryWriterOptions,
}

impl MemoryWriterFactory {
    pub fn new(options: MemoryWriterOptions) -> Self {
        Self { options }
    }
}

impl WriterFactory for MemoryWriterFactory {
    fn create(&self, target: &Path) -> RecordingResult<Box<dyn ContainerWriter>> {
        Ok(Box::new(MemoryWriter::new(target, self.options.clone())))
    }
}

/// Writer that records timing only
pub struct MemoryWriter {
    target: PathBuf,
    options: MemoryWriterOptions,
    video: Option<VideoTrackSettings>,
    audio: Option<AudioTrackSettings>,
    started: bool,
    finished: [bool; 2],
    video_pts: Vec<Duration>,
    /// (pts, duration, frames) per audio chunk
    audio_chunks: Vec<(Duration, Duration, u64)>,
}

impl MemoryWriter {
    pub fn new(target: &Path, options: MemoryWriterOptions) -> Self {
        Self {
            target: target.to_path_buf(),
            options,
            video: None,
            audio: None,
            started: false,
            finished: [false, false],
            video_pts: Vec::new(),
            audio_chunks: Vec::new(),
        }
    }

    fn accepting(&self, kind: MediaKind) -> RecordingResult<()> {
        if !self.started || self.finished[kind.index()] {
            return Err(RecordingError::NotRecording);
        }
        if !self.options.append_delay.is_zero() {
            std::thread::sleep(self.options.append_delay);
        }
        Ok(())
    }

    fn manifest(&self) -> RecordingManifest {
        let video = self.video.as_ref();
        let video_end = match (self.video_pts.last(), video) {
            (Some(last), Some(track)) => *last + track.frame_interval(),
            _ => Duration::ZERO,
        };
        let audio_end = self
            .audio_chunks
            .last()
            .map(|(pts, duration, _)| *pts + *duration)
            .unwrap_or_default();

        RecordingManifest {
            width: video.map(|v| v.width).unwrap_or_default(),
            height: video.map(|v| v.height).unwrap_or_default(),
            video_codec: video.map(|v| v.codec.clone()).unwrap_or_default(),
            audio_codec: self.audio.as_ref().map(|a| a.codec.clone()).unwrap_or_default(),
            video_frames: self.video_pts.len() as u64,
            audio_frames: self.audio_chunks.iter().map(|(_, _, frames)| frames).sum(),
            duration_ms: video_end.max(audio_end).as_secs_f64() * 1000.0,
        }
    }
}

impl ContainerWriter for MemoryWriter {
    fn add_video_track(&mut self, settings: &VideoTrackSettings) -> RecordingResult<()> {
        if self.options.reject_video {
            return Err(RecordingError::Configuration(format!(
                "codec {} unsupported",
                settings.codec
            )));
        }
        self.video = Some(settings.clone());
        Ok(())
    }

    fn add_audio_track(&mut self, settings: &AudioTrackSettings) -> RecordingResult<()> {
        if self.options.reject_audio {
            return Err(RecordingError::Configuration(format!(
                "codec {} unsupported",
                settings.codec
            )));
        }
        self.audio = Some(settings.clone());
        Ok(())
    }

    fn start(&mut self) -> RecordingResult<()> {
        if self.options.fail_start {
            return Err(RecordingError::WriterStartFailed(format!(
                "cannot open {:?}",
                self.target
            )));
        }
        std::fs::File::create(&self.target)
            .map_err(|e| RecordingError::WriterStartFailed(format!("{:?}: {}", self.target, e)))?;
        self.started = true;
        Ok(())
    }

    fn is_ready_for_more(&self, kind: MediaKind) -> bool {
        self.started && !self.finished[kind.index()] && self.options.ready.load(Ordering::SeqCst)
    }

    fn append_video(&mut self, frame: &VideoFrame, pts: Duration) -> RecordingResult<()> {
        self.accepting(MediaKind::Video)?;
        if let Some(track) = &self.video {
            if frame.width() != track.width || frame.height() != track.height {
                return Err(RecordingError::Configuration(format!(
                    "frame is {}x{}, track is {}x{}",
                    frame.width(),
                    frame.height(),
                    track.width,
                    track.height
                )));
            }
        }
        self.video_pts.push(pts);
        Ok(())
    }

    fn append_audio(&mut self, sample: &AudioSample, pts: Duration) -> RecordingResult<()> {
        self.accepting(MediaKind::Audio)?;
        self.audio_chunks
            .push((pts, sample.duration(), sample.frames() as u64));
        Ok(())
    }

    fn mark_finished(&mut self, kind: MediaKind) {
        self.finished[kind.index()] = true;
    }

    fn finish(&mut self) -> RecordingResult<()> {
        if self.options.fail_finish {
            return Err(RecordingError::WriterFinishFailed(
                "simulated finalization failure".to_string(),
            ));
        }
        let manifest = self.manifest();
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| RecordingError::WriterFinishFailed(e.to_string()))?;
        std::fs::write(&self.target, json)?;
        Ok(())
    }

    fn abort(&mut self) {
        if self.target.exists() {
            if let Err(e) = std::fs::remove_file(&self.target) {
                tracing::warn!("Failed to remove partial output {:?}: {}", self.target, e);
            }
        }
    }
}
