//! FFmpeg-backed container writer
//!
//! Raw video frames are piped into an FFmpeg encoder process at a constant
//! frame rate; presentation timestamps are mapped onto that frame grid by
//! repeating or coalescing frames. Audio PCM is spooled to a scratch file and
//! muxed with the encoded video when the session finishes.
//!
//! Both tracks start at the session origin: the first video frame is repeated
//! back to slot 0 and the audio spool is padded with silence, so a sample at
//! pts `t` plays at `t` in the output.

use super::{AudioTrackSettings, ContainerFormat, ContainerWriter, VideoTrackSettings, WriterFactory};
use crate::media::{AudioSample, MediaKind, VideoFrame};
use crate::recorder::error::{RecordingError, RecordingResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

/// Creates [`FfmpegWriter`]s
#[derive(Debug, Clone)]
pub struct FfmpegWriterFactory {
    ffmpeg_path: PathBuf,
    container: ContainerFormat,
}

impl FfmpegWriterFactory {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, container: ContainerFormat) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            container,
        }
    }
}

impl WriterFactory for FfmpegWriterFactory {
    fn create(&self, target: &Path) -> RecordingResult<Box<dyn ContainerWriter>> {
        Ok(Box::new(FfmpegWriter::new(
            self.ffmpeg_path.clone(),
            target,
            self.container,
        )))
    }
}

/// Audio spool for the scratch PCM file
struct AudioSpool {
    file: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

/// Container writer driving an FFmpeg encoder process
pub struct FfmpegWriter {
    ffmpeg_path: PathBuf,
    target: PathBuf,
    container: ContainerFormat,
    video: Option<VideoTrackSettings>,
    audio: Option<AudioTrackSettings>,
    scratch: Option<TempDir>,
    encoder: Option<Child>,
    stdin: Option<ChildStdin>,
    spool: Option<AudioSpool>,
    next_frame_index: u64,
    last_frame: Option<VideoFrame>,
    frames_written: u64,
}

impl FfmpegWriter {
    pub fn new(ffmpeg_path: PathBuf, target: &Path, container: ContainerFormat) -> Self {
        Self {
            ffmpeg_path,
            target: target.to_path_buf(),
            container,
            video: None,
            audio: None,
            scratch: None,
            encoder: None,
            stdin: None,
            spool: None,
            next_frame_index: 0,
            last_frame: None,
            frames_written: 0,
        }
    }

    /// Frames piped to the encoder so far, repeats included
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// PCM sample frames spooled so far, silence included
    pub fn audio_frames_spooled(&self) -> u64 {
        self.spool.as_ref().map_or(0, |spool| spool.frames_written)
    }

    fn scratch_video_path(&self) -> Option<PathBuf> {
        self.scratch
            .as_ref()
            .map(|dir| dir.path().join(format!("video.{}", self.container.extension())))
    }

    fn write_frame(&mut self, frame: &VideoFrame) -> RecordingResult<()> {
        let stdin = self.stdin.as_mut().ok_or(RecordingError::NotRecording)?;
        stdin.write_all(frame.data())?;
        self.next_frame_index += 1;
        self.frames_written += 1;
        Ok(())
    }

    /// Check the target is writable and create the scratch directory
    ///
    /// Returns the path the encoder writes the video-only stream to.
    fn prepare_scratch(&mut self) -> RecordingResult<PathBuf> {
        let start_failed = |e: std::io::Error| RecordingError::WriterStartFailed(e.to_string());

        File::create(&self.target).map_err(start_failed)?;

        let parent = self
            .target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let scratch = tempfile::Builder::new()
            .prefix(".recording-")
            .tempdir_in(parent)
            .map_err(start_failed)?;
        self.scratch = Some(scratch);

        self.scratch_video_path()
            .ok_or_else(|| RecordingError::WriterStartFailed("no scratch directory".to_string()))
    }

    /// Spawn the encoder with a piped stdin and open the audio spool
    fn launch(&mut self, mut command: Command) -> RecordingResult<()> {
        let mut encoder = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RecordingError::WriterStartFailed(format!(
                    "failed to start FFmpeg ({:?}): {}",
                    self.ffmpeg_path, e
                ))
            })?;

        self.stdin = encoder.stdin.take();
        self.encoder = Some(encoder);

        if let Some(scratch) = &self.scratch {
            let path = scratch.path().join("audio.pcm");
            let file = File::create(&path)
                .map_err(|e| RecordingError::WriterStartFailed(e.to_string()))?;
            self.spool = Some(AudioSpool {
                file: BufWriter::new(file),
                path,
                frames_written: 0,
            });
        }
        Ok(())
    }

    fn wait_for_encoder(&mut self) -> RecordingResult<()> {
        self.stdin = None;
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let output = encoder.wait_with_output()?;
        if !output.status.success() {
            return Err(RecordingError::WriterFinishFailed(format!(
                "FFmpeg encoder exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Index of the constant-rate frame slot a timestamp falls into
pub fn frame_index(pts: Duration, fps: u32) -> u64 {
    (pts.as_secs_f64() * fps as f64).round() as u64
}

/// Arguments for the raw-video encoder process
pub fn encoder_args(video: &VideoTrackSettings, container: ContainerFormat, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        video.pixel_format.ffmpeg_name().into(),
        "-video_size".into(),
        format!("{}x{}", video.width, video.height),
        "-framerate".into(),
        video.fps.to_string(),
        "-i".into(),
        "-".into(),
        "-c:v".into(),
        video.codec.clone(),
        "-b:v".into(),
        video.bitrate.to_string(),
    ];
    if let Some(profile) = &video.profile {
        args.extend(["-profile:v".into(), profile.clone()]);
    }
    args.extend([
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-g".into(),
        (video.fps * 2).to_string(),
        "-an".into(),
        "-f".into(),
        container.muxer().into(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// Arguments for the final pass joining encoded video with spooled PCM
pub fn mux_args(
    video_path: &Path,
    audio_path: &Path,
    audio: &AudioTrackSettings,
    container: ContainerFormat,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        video_path.to_string_lossy().to_string(),
        "-f".into(),
        "s16le".into(),
        "-ar".into(),
        audio.sample_rate.to_string(),
        "-ac".into(),
        audio.channels.to_string(),
        "-i".into(),
        audio_path.to_string_lossy().to_string(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        audio.codec.clone(),
        "-b:a".into(),
        audio.bitrate.to_string(),
    ];
    if container == ContainerFormat::Mp4 || container == ContainerFormat::Mov {
        args.extend(["-movflags".into(), "+faststart".into()]);
    }
    args.extend([
        "-f".into(),
        container.muxer().into(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

impl ContainerWriter for FfmpegWriter {
    fn add_video_track(&mut self, settings: &VideoTrackSettings) -> RecordingResult<()> {
        if settings.codec.is_empty() {
            return Err(RecordingError::Configuration("empty video codec".to_string()));
        }
        if settings.width == 0 || settings.height == 0 || settings.fps == 0 {
            return Err(RecordingError::Configuration(format!(
                "invalid video geometry {}x{} @ {}fps",
                settings.width, settings.height, settings.fps
            )));
        }
        // 4:2:0 output needs even dimensions
        if settings.width % 2 != 0 || settings.height % 2 != 0 {
            return Err(RecordingError::Configuration(format!(
                "{} requires even dimensions, got {}x{}",
                settings.codec, settings.width, settings.height
            )));
        }
        self.video = Some(settings.clone());
        Ok(())
    }

    fn add_audio_track(&mut self, settings: &AudioTrackSettings) -> RecordingResult<()> {
        if settings.codec.is_empty() || settings.sample_rate == 0 {
            return Err(RecordingError::Configuration(format!(
                "invalid audio track {} @ {} Hz",
                settings.codec, settings.sample_rate
            )));
        }
        if !(1..=2).contains(&settings.channels) {
            return Err(RecordingError::Configuration(format!(
                "unsupported channel count {}",
                settings.channels
            )));
        }
        self.audio = Some(settings.clone());
        Ok(())
    }

    fn start(&mut self) -> RecordingResult<()> {
        let video = self
            .video
            .clone()
            .ok_or_else(|| RecordingError::WriterStartFailed("no video track".to_string()))?;

        let video_path = self.prepare_scratch()?;
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(encoder_args(&video, self.container, &video_path));
        self.launch(command)?;

        tracing::info!(
            "Started FFmpeg encoder: {}x{} @ {}fps, {} @ {} bps, output: {:?}",
            video.width,
            video.height,
            video.fps,
            video.codec,
            video.bitrate,
            self.target
        );
        Ok(())
    }

    fn is_ready_for_more(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video => self.stdin.is_some(),
            MediaKind::Audio => self.spool.is_some(),
        }
    }

    fn append_video(&mut self, frame: &VideoFrame, pts: Duration) -> RecordingResult<()> {
        let video = self.video.as_ref().ok_or(RecordingError::NotRecording)?;
        if frame.width() != video.width
            || frame.height() != video.height
            || frame.format() != video.pixel_format
            || !frame.is_well_formed()
        {
            return Err(RecordingError::Configuration(format!(
                "frame {}x{} {:?} does not match track {}x{} {:?}",
                frame.width(),
                frame.height(),
                frame.format(),
                video.width,
                video.height,
                video.pixel_format
            )));
        }

        let fps = video.fps;
        let index = frame_index(pts, fps);
        let Some(previous) = self.last_frame.clone() else {
            // First frame also covers the slots back to the session origin
            for _ in 0..index {
                self.write_frame(frame)?;
            }
            self.write_frame(frame)?;
            self.last_frame = Some(frame.clone());
            return Ok(());
        };

        if index < self.next_frame_index {
            // Slot already filled; the newer picture carries into the next gap
            self.last_frame = Some(frame.clone());
            return Ok(());
        }

        let gap = index - self.next_frame_index;
        if gap > u64::from(fps) {
            tracing::debug!("Filling {} empty frame slots", gap);
        }
        for _ in 0..gap {
            self.write_frame(&previous)?;
        }

        self.write_frame(frame)?;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn append_audio(&mut self, sample: &AudioSample, pts: Duration) -> RecordingResult<()> {
        let audio = self.audio.as_ref().ok_or(RecordingError::NotRecording)?;
        if sample.sample_rate() != audio.sample_rate || sample.channels() != audio.channels {
            return Err(RecordingError::Configuration(format!(
                "audio {} Hz x{} does not match track {} Hz x{}",
                sample.sample_rate(),
                sample.channels(),
                audio.sample_rate,
                audio.channels
            )));
        }
        let channels = audio.channels as usize;
        let expected = frame_index(pts, audio.sample_rate);
        let spool = self.spool.as_mut().ok_or(RecordingError::NotRecording)?;

        let mut skip = 0usize;
        if expected > spool.frames_written {
            let silence = (expected - spool.frames_written) as usize * channels;
            spool.file.write_all(&vec![0u8; silence * 2])?;
            spool.frames_written = expected;
        } else {
            // Overlaps audio already spooled; trim the front
            skip = (spool.frames_written - expected) as usize;
        }

        if skip >= sample.frames() {
            tracing::trace!("Dropping audio chunk at {:?} covered by earlier audio", pts);
            return Ok(());
        }

        let data = &sample.data()[skip * channels..];
        let mut bytes = Vec::with_capacity(data.len() * 2);
        for value in data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        spool.file.write_all(&bytes)?;
        spool.frames_written += (sample.frames() - skip) as u64;
        Ok(())
    }

    fn mark_finished(&mut self, kind: MediaKind) {
        match kind {
            // Closing stdin lets the encoder drain and exit
            MediaKind::Video => self.stdin = None,
            MediaKind::Audio => {
                if let Some(spool) = self.spool.as_mut() {
                    if let Err(e) = spool.file.flush() {
                        tracing::warn!("Failed to flush audio spool: {}", e);
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> RecordingResult<()> {
        self.wait_for_encoder()?;

        if self.frames_written == 0 {
            return Err(RecordingError::WriterFinishFailed(
                "no video frames were encoded".to_string(),
            ));
        }

        let video_path = self
            .scratch_video_path()
            .ok_or_else(|| RecordingError::WriterFinishFailed("scratch directory missing".to_string()))?;

        let spool = self.spool.take();
        match (spool, self.audio.as_ref()) {
            (Some(mut spool), Some(audio)) if spool.frames_written > 0 => {
                spool.file.flush()?;
                drop(spool.file);

                let output = Command::new(&self.ffmpeg_path)
                    .args(mux_args(&video_path, &spool.path, audio, self.container, &self.target))
                    .stdin(Stdio::null())
                    .output()
                    .map_err(|e| {
                        RecordingError::WriterFinishFailed(format!("failed to run FFmpeg mux: {e}"))
                    })?;

                if !output.status.success() {
                    return Err(RecordingError::WriterFinishFailed(format!(
                        "FFmpeg mux failed: {}",
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }
            }
            _ => {
                std::fs::rename(&video_path, &self.target)?;
            }
        }

        tracing::info!(
            "FFmpeg writer finalized {:?} ({} frames)",
            self.target,
            self.frames_written
        );
        self.scratch = None;
        Ok(())
    }

    fn abort(&mut self) {
        self.stdin = None;
        if let Some(mut encoder) = self.encoder.take() {
            let _ = encoder.kill();
            let _ = encoder.wait();
        }
        self.spool = None;
        self.scratch = None;
        if self.target.exists() {
            if let Err(e) = std::fs::remove_file(&self.target) {
                tracing::warn!("Failed to remove partial output {:?}: {}", self.target, e);
            }
        }
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            let _ = encoder.kill();
            let _ = encoder.wait();
        }
    }
}
