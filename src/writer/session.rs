//! Container write session
//!
//! Wraps a [`ContainerWriter`] with the configure → start → append → finish
//! lifecycle. The first appended sample fixes the time origin; every later
//! sample is stamped relative to it.

use super::{ContainerWriter, WriterFactory, WriterSettings};
use crate::media::{MediaKind, SampleBuffer, SamplePayload};
use crate::recorder::error::{RecordingError, RecordingResult};
use crate::recorder::state::WriterStatus;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Why a sample was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The session is not in the writing state
    NotWriting,
    /// The writer cannot take more data on this track right now
    Backpressure,
    /// Captured before the session time origin
    BeforeOrigin,
    /// Not later than the previous sample on the same track
    NonMonotonic,
    /// The writer refused the sample
    Rejected,
}

/// Result of a single append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { pts: Duration },
    Dropped(DropReason),
}

/// One configured writer and its timing state
pub struct WriteSession {
    target: PathBuf,
    writer: Box<dyn ContainerWriter>,
    status: WriterStatus,
    time_origin: Option<Duration>,
    last_pts: [Option<Duration>; 2],
}

impl WriteSession {
    /// Create a writer for `target` and add both tracks
    pub fn configure(
        factory: &dyn WriterFactory,
        target: &Path,
        settings: &WriterSettings,
    ) -> RecordingResult<Self> {
        let mut writer = factory.create(target)?;

        writer
            .add_video_track(&settings.video)
            .map_err(|e| configuration_error("video", e))?;
        writer
            .add_audio_track(&settings.audio)
            .map_err(|e| configuration_error("audio", e))?;

        tracing::debug!(
            "Configured writer for {:?}: {}x{} {} @ {} bps, audio {} {} Hz",
            target,
            settings.video.width,
            settings.video.height,
            settings.video.codec,
            settings.video.bitrate,
            settings.audio.codec,
            settings.audio.sample_rate
        );

        Ok(Self {
            target: target.to_path_buf(),
            writer,
            status: WriterStatus::Unconfigured,
            time_origin: None,
            last_pts: [None, None],
        })
    }

    /// Open the output and move to `Writing`
    pub fn start(&mut self) -> RecordingResult<()> {
        if self.status != WriterStatus::Unconfigured {
            return Err(RecordingError::WriterStartFailed(format!(
                "writer is {:?}",
                self.status
            )));
        }

        match self.writer.start() {
            Ok(()) => {
                self.status = WriterStatus::Writing;
                Ok(())
            }
            Err(e) => {
                self.status = WriterStatus::Failed;
                self.writer.abort();
                Err(match e {
                    RecordingError::WriterStartFailed(msg) => RecordingError::WriterStartFailed(msg),
                    other => RecordingError::WriterStartFailed(other.to_string()),
                })
            }
        }
    }

    pub fn status(&self) -> WriterStatus {
        self.status
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Capture time of the first appended sample
    pub fn time_origin(&self) -> Option<Duration> {
        self.time_origin
    }

    pub fn is_ready_for_more(&self, kind: MediaKind) -> bool {
        self.status == WriterStatus::Writing && self.writer.is_ready_for_more(kind)
    }

    /// Append one sample, or say why it was dropped
    pub fn append(&mut self, sample: SampleBuffer) -> AppendOutcome {
        let kind = sample.kind();
        if self.status != WriterStatus::Writing {
            return AppendOutcome::Dropped(DropReason::NotWriting);
        }
        if !self.writer.is_ready_for_more(kind) {
            return AppendOutcome::Dropped(DropReason::Backpressure);
        }

        let origin = self.time_origin.unwrap_or(sample.capture_time);
        let Some(pts) = sample.capture_time.checked_sub(origin) else {
            return AppendOutcome::Dropped(DropReason::BeforeOrigin);
        };
        if self.last_pts[kind.index()].is_some_and(|last| pts <= last) {
            return AppendOutcome::Dropped(DropReason::NonMonotonic);
        }

        let result = match &sample.payload {
            SamplePayload::Video(frame) => self.writer.append_video(frame, pts),
            SamplePayload::Audio(audio) => self.writer.append_audio(audio, pts),
        };

        match result {
            Ok(()) => {
                self.time_origin = Some(origin);
                self.last_pts[kind.index()] = Some(pts);
                AppendOutcome::Appended { pts }
            }
            Err(e) => {
                tracing::trace!("Writer rejected {:?} sample at {:?}: {}", kind, pts, e);
                AppendOutcome::Dropped(DropReason::Rejected)
            }
        }
    }

    /// Finalize the output
    ///
    /// Consumes the session, so nothing can be appended once finishing has
    /// begun. `callback` runs exactly once, on the calling thread, with the
    /// output path or the writer error. A session that never received a
    /// sample reports [`RecordingError::NoSamples`] and leaves no file behind.
    pub fn finish<F>(mut self, callback: F)
    where
        F: FnOnce(RecordingResult<PathBuf>),
    {
        self.status = WriterStatus::Finishing;
        self.writer.mark_finished(MediaKind::Video);
        self.writer.mark_finished(MediaKind::Audio);

        if self.time_origin.is_none() {
            self.writer.abort();
            self.status = WriterStatus::Failed;
            callback(Err(RecordingError::NoSamples));
            return;
        }

        match self.writer.finish() {
            Ok(()) => {
                self.status = WriterStatus::Completed;
                tracing::info!("Finished writing {:?}", self.target);
                callback(Ok(self.target.clone()));
            }
            Err(e) => {
                self.status = WriterStatus::Failed;
                tracing::warn!("Writer failed to finalize {:?}: {}", self.target, e);
                self.writer.abort();
                callback(Err(match e {
                    RecordingError::WriterFinishFailed(msg) => RecordingError::WriterFinishFailed(msg),
                    other => RecordingError::WriterFinishFailed(other.to_string()),
                }));
            }
        }
    }
}

fn configuration_error(track: &str, error: RecordingError) -> RecordingError {
    match error {
        RecordingError::Configuration(msg) => {
            RecordingError::Configuration(format!("{track} track rejected: {msg}"))
        }
        other => RecordingError::Configuration(format!("{track} track rejected: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSample, PixelFormat, VideoFrame};
    use crate::writer::memory::{MemoryWriterFactory, MemoryWriterOptions};
    use crate::writer::{AudioTrackSettings, ContainerFormat, VideoTrackSettings};
    use std::sync::atomic::Ordering;

    fn settings(width: u32, height: u32) -> WriterSettings {
        WriterSettings {
            container: ContainerFormat::Mp4,
            video: VideoTrackSettings {
                codec: "h264".to_string(),
                width,
                height,
                bitrate: 6_000_000,
                fps: 30,
                profile: None,
                pixel_format: PixelFormat::Argb,
            },
            audio: AudioTrackSettings {
                codec: "aac".to_string(),
                sample_rate: 44_100,
                channels: 2,
                bitrate: 128_000,
            },
        }
    }

    fn video_at(ms: u64) -> SampleBuffer {
        SampleBuffer::video(
            VideoFrame::solid(4, 4, PixelFormat::Argb, [255, 0, 0, 0]),
            Duration::from_millis(ms),
        )
    }

    fn audio_at(ms: u64) -> SampleBuffer {
        SampleBuffer::audio(
            AudioSample::silence(44_100, 2, Duration::from_millis(10)),
            Duration::from_millis(ms),
        )
    }

    fn started(factory: &MemoryWriterFactory, target: &Path) -> WriteSession {
        let mut session = WriteSession::configure(factory, target, &settings(4, 4)).unwrap();
        assert_eq!(session.status(), WriterStatus::Unconfigured);
        session.start().unwrap();
        assert_eq!(session.status(), WriterStatus::Writing);
        session
    }

    #[test]
    fn test_first_sample_sets_origin() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::default();
        let mut session = started(&factory, &dir.path().join("a.mp4"));

        assert_eq!(session.time_origin(), None);
        assert_eq!(
            session.append(video_at(500)),
            AppendOutcome::Appended { pts: Duration::ZERO }
        );
        assert_eq!(session.time_origin(), Some(Duration::from_millis(500)));
        assert_eq!(
            session.append(audio_at(510)),
            AppendOutcome::Appended {
                pts: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn test_rejects_samples_before_origin() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::default();
        let mut session = started(&factory, &dir.path().join("a.mp4"));

        session.append(video_at(100));
        assert_eq!(
            session.append(audio_at(90)),
            AppendOutcome::Dropped(DropReason::BeforeOrigin)
        );
    }

    #[test]
    fn test_rejects_non_monotonic_samples_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::default();
        let mut session = started(&factory, &dir.path().join("a.mp4"));

        session.append(video_at(0));
        session.append(video_at(33));
        assert_eq!(
            session.append(video_at(33)),
            AppendOutcome::Dropped(DropReason::NonMonotonic)
        );
        // The audio track keeps its own ordering
        assert!(matches!(
            session.append(audio_at(10)),
            AppendOutcome::Appended { .. }
        ));
    }

    #[test]
    fn test_drops_when_writer_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let options = MemoryWriterOptions::default();
        let ready = options.ready.clone();
        let factory = MemoryWriterFactory::new(options);
        let mut session = started(&factory, &dir.path().join("a.mp4"));

        ready.store(false, Ordering::SeqCst);
        assert!(!session.is_ready_for_more(MediaKind::Video));
        assert_eq!(
            session.append(video_at(0)),
            AppendOutcome::Dropped(DropReason::Backpressure)
        );
        assert_eq!(session.time_origin(), None);
    }

    #[test]
    fn test_append_before_start_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::default();
        let mut session =
            WriteSession::configure(&factory, &dir.path().join("a.mp4"), &settings(4, 4)).unwrap();
        assert_eq!(
            session.append(video_at(0)),
            AppendOutcome::Dropped(DropReason::NotWriting)
        );
    }

    #[test]
    fn test_configure_rejected_track() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::new(MemoryWriterOptions {
            reject_video: true,
            ..Default::default()
        });
        let result = WriteSession::configure(&factory, &dir.path().join("a.mp4"), &settings(4, 4));
        assert!(matches!(result, Err(RecordingError::Configuration(_))));
    }

    #[test]
    fn test_start_failure() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::new(MemoryWriterOptions {
            fail_start: true,
            ..Default::default()
        });
        let mut session =
            WriteSession::configure(&factory, &dir.path().join("a.mp4"), &settings(4, 4)).unwrap();
        assert!(matches!(
            session.start(),
            Err(RecordingError::WriterStartFailed(_))
        ));
        assert_eq!(session.status(), WriterStatus::Failed);
    }

    #[test]
    fn test_finish_without_samples() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("empty.mp4");
        let factory = MemoryWriterFactory::default();
        let session = started(&factory, &target);

        let mut calls = 0;
        session.finish(|result| {
            calls += 1;
            assert!(matches!(result, Err(RecordingError::NoSamples)));
        });
        assert_eq!(calls, 1);
        assert!(!target.exists());
    }

    #[test]
    fn test_finish_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mp4");
        let factory = MemoryWriterFactory::default();
        let mut session = started(&factory, &target);
        session.append(video_at(0));

        let mut output = None;
        session.finish(|result| output = Some(result.unwrap()));
        assert_eq!(output.as_deref(), Some(target.as_path()));
        assert!(target.exists());
    }

    #[test]
    fn test_finish_failure_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::new(MemoryWriterOptions {
            fail_finish: true,
            ..Default::default()
        });
        let mut session = started(&factory, &dir.path().join("out.mp4"));
        session.append(video_at(0));

        let mut calls = 0;
        session.finish(|result| {
            calls += 1;
            assert!(matches!(result, Err(RecordingError::WriterFinishFailed(_))));
        });
        assert_eq!(calls, 1);
    }
}
