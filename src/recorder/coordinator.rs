//! Recording coordinator
//!
//! Owns the recording lifecycle: validates and starts a write session, routes
//! captured samples to the recording queue, and finalizes on stop.

use super::error::{RecordingError, RecordingResult};
use super::queue::SampleQueue;
use super::state::{
    FrameSize, RecorderStatus, RecordingOutput, RecordingPhase, RecordingSession, RecordingStats,
};
use crate::config::RecorderConfig;
use crate::media::{AudioSample, OverlayImage, VideoFrame};
use crate::writer::{WriteSession, WriterFactory};
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording started
    Started { output_path: PathBuf },
    /// Recording finalized
    Stopped { output_path: PathBuf },
    /// Finalization failed
    Error(String),
}

/// Session slot and publishers, shared with the finalization task
struct Lifecycle {
    /// Active session, present from start until finalization resolves
    session: Mutex<Option<RecordingSession>>,

    /// Counters of the last finished session
    last_stats: Mutex<RecordingStats>,

    status_tx: watch::Sender<RecorderStatus>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl Lifecycle {
    fn publish(&self, phase: RecordingPhase, output_path: Option<PathBuf>) {
        let status = RecorderStatus {
            phase,
            is_recording: matches!(phase, RecordingPhase::Writing | RecordingPhase::Finishing),
            output_path,
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Publish the outcome of finalization and release the session slot
    fn complete(
        &self,
        session: RecordingSession,
        result: RecordingResult<PathBuf>,
        stats: RecordingStats,
    ) -> RecordingResult<RecordingOutput> {
        *self.last_stats.lock() = stats;

        let outcome = match result {
            Ok(output_path) => {
                let output = RecordingOutput {
                    output_path: output_path.clone(),
                    frame_size: session.frame_size,
                    elapsed_ms: session.elapsed_ms(),
                    stats,
                };
                tracing::info!(
                    "Recording stopped. Duration: {}ms, {} frames, {} dropped",
                    output.elapsed_ms,
                    stats.video_appended,
                    stats.dropped()
                );
                let _ = self.event_tx.send(RecordingEvent::Stopped { output_path });
                Ok(output)
            }
            Err(e) => {
                tracing::warn!("Recording failed: {}", e);
                self.publish(RecordingPhase::Failed, None);
                let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
                Err(e)
            }
        };

        self.release();
        outcome
    }

    fn release(&self) {
        *self.session.lock() = None;
        self.publish(RecordingPhase::Idle, None);
    }
}

/// Coordinates the write session, the recording queue and status publication
pub struct RecordingCoordinator {
    config: RecorderConfig,

    factory: Arc<dyn WriterFactory>,

    lifecycle: Arc<Lifecycle>,

    /// Queue for the session currently accepting samples
    queue: RwLock<Option<SampleQueue>>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(config: RecorderConfig, factory: Arc<dyn WriterFactory>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (status_tx, _) = watch::channel(RecorderStatus::default());
        Self {
            config,
            factory,
            lifecycle: Arc::new(Lifecycle {
                session: Mutex::new(None),
                last_stats: Mutex::new(RecordingStats::default()),
                status_tx,
                event_tx,
            }),
            queue: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> RecordingPhase {
        self.lifecycle.status_tx.borrow().phase
    }

    pub fn is_recording(&self) -> bool {
        self.lifecycle.status_tx.borrow().is_recording
    }

    /// Snapshot of the active session, if any
    pub fn session(&self) -> Option<RecordingSession> {
        let mut session = self.lifecycle.session.lock().clone()?;
        if let Some(queue) = self.queue.read().as_ref() {
            session.time_origin = queue.time_origin();
        }
        Some(session)
    }

    /// Observe status changes
    pub fn watch_status(&self) -> watch::Receiver<RecorderStatus> {
        self.lifecycle.status_tx.subscribe()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.lifecycle.event_tx.subscribe()
    }

    /// Counters of the active session, or of the last one if idle
    pub fn stats(&self) -> RecordingStats {
        match self.queue.read().as_ref() {
            Some(queue) => queue.stats(),
            None => *self.lifecycle.last_stats.lock(),
        }
    }

    /// Start recording at `frame_size`
    ///
    /// Returns once the writer has accepted its configuration and opened the
    /// output; no encoding happens on the calling thread.
    pub fn start_recording(&self, frame_size: FrameSize) -> RecordingResult<PathBuf> {
        if frame_size.is_empty() {
            return Err(RecordingError::Configuration(format!(
                "invalid frame size {frame_size}"
            )));
        }

        let mut slot = self.lifecycle.session.lock();
        if slot.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            RecordingError::WriterStartFailed(format!("cannot create {output_dir:?}: {e}"))
        })?;
        let output_path = output_dir.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.container.extension()
        ));

        tracing::info!("Starting recording {} to: {:?}", frame_size, output_path);

        let settings = self.config.writer_settings(frame_size);
        let mut write_session = WriteSession::configure(self.factory.as_ref(), &output_path, &settings)?;
        write_session.start()?;

        let queue = SampleQueue::spawn(write_session, self.config.queue_depth)?;
        *self.queue.write() = Some(queue);
        *slot = Some(RecordingSession::new(output_path.clone(), frame_size));
        drop(slot);

        self.lifecycle
            .publish(RecordingPhase::Writing, Some(output_path.clone()));
        let _ = self.lifecycle.event_tx.send(RecordingEvent::Started {
            output_path: output_path.clone(),
        });

        tracing::info!("Recording started");
        Ok(output_path)
    }

    /// Stop recording and finalize the output file
    ///
    /// Finalization runs on its own task, so session state is cleared once it
    /// resolves even if the returned future is dropped first.
    pub async fn stop_recording(&self) -> RecordingResult<RecordingOutput> {
        let (queue, session) = {
            let mut slot = self.lifecycle.session.lock();
            let Some(session) = slot.as_mut() else {
                return Err(RecordingError::NotRecording);
            };
            if session.phase != RecordingPhase::Writing {
                return Err(RecordingError::NotRecording);
            }
            let Some(queue) = self.queue.write().take() else {
                return Err(RecordingError::NotRecording);
            };
            session.phase = RecordingPhase::Finishing;
            session.time_origin = queue.time_origin();
            (queue, session.clone())
        };

        tracing::info!("Stopping recording");
        self.lifecycle
            .publish(RecordingPhase::Finishing, Some(session.output_path.clone()));

        let lifecycle = self.lifecycle.clone();
        let finalize = tokio::spawn(async move {
            let (result, stats) = queue.finish().await;
            lifecycle.complete(session, result, stats)
        });

        match finalize.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Finalization task failed: {}", e);
                self.lifecycle.release();
                Err(RecordingError::WriterFinishFailed(e.to_string()))
            }
        }
    }

    /// Queue a video frame; silently dropped unless a session is writing
    pub fn append_video_frame(
        &self,
        frame: VideoFrame,
        capture_time: Duration,
        overlay: Option<OverlayImage>,
    ) {
        if let Some(queue) = self.queue.read().as_ref() {
            queue.submit_video(frame, capture_time, overlay);
        }
    }

    /// Queue an audio chunk; silently dropped unless a session is writing
    pub fn append_audio_frame(&self, sample: AudioSample, capture_time: Duration) {
        if let Some(queue) = self.queue.read().as_ref() {
            queue.submit_audio(sample, capture_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PixelFormat;
    use crate::writer::memory::{MemoryWriterFactory, MemoryWriterOptions, RecordingManifest};
    use std::sync::atomic::Ordering;

    fn coordinator(dir: &std::path::Path, options: MemoryWriterOptions) -> RecordingCoordinator {
        let config = RecorderConfig {
            output_dir: Some(dir.to_path_buf()),
            queue_depth: 64,
            ..Default::default()
        };
        RecordingCoordinator::new(config, Arc::new(MemoryWriterFactory::new(options)))
    }

    fn frame(size: FrameSize) -> VideoFrame {
        VideoFrame::solid(size.width, size.height, PixelFormat::Argb, [255, 0, 0, 0])
    }

    #[test]
    fn test_rejects_empty_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        for size in [FrameSize::new(0, 1080), FrameSize::new(1920, 0)] {
            assert!(matches!(
                recorder.start_recording(size),
                Err(RecordingError::Configuration(_))
            ));
        }
        assert_eq!(recorder.phase(), RecordingPhase::Idle);
        assert!(recorder.session().is_none());
    }

    #[tokio::test]
    async fn test_second_start_fails_and_first_session_survives() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let size = FrameSize::new(16, 8);

        let first = recorder.start_recording(size).unwrap();
        let second = recorder.start_recording(size);
        assert!(matches!(second, Err(RecordingError::AlreadyRecording)));
        assert!(second.unwrap_err().is_configuration());

        let session = recorder.session().unwrap();
        assert_eq!(session.output_path, first);
        assert!(recorder.is_recording());

        recorder.append_video_frame(frame(size), Duration::ZERO, None);
        let output = recorder.stop_recording().await.unwrap();
        assert_eq!(output.output_path, first);
    }

    #[tokio::test]
    async fn test_stop_while_idle() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let status = recorder.watch_status();

        assert!(matches!(
            recorder.stop_recording().await,
            Err(RecordingError::NotRecording)
        ));
        assert_eq!(recorder.phase(), RecordingPhase::Idle);
        assert!(!status.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_append_while_idle_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let status = recorder.watch_status();
        let mut events = recorder.subscribe();

        recorder.append_video_frame(frame(FrameSize::new(4, 4)), Duration::ZERO, None);
        recorder.append_audio_frame(
            AudioSample::silence(44_100, 2, Duration::from_millis(10)),
            Duration::ZERO,
        );

        assert_eq!(recorder.stats(), RecordingStats::default());
        assert!(!status.has_changed().unwrap());
        assert!(events.try_recv().is_err());
        assert!(recorder.session().is_none());
    }

    #[tokio::test]
    async fn test_immediate_stop_reports_no_samples_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let size = FrameSize::new(1920, 1080);

        let path = recorder.start_recording(size).unwrap();
        assert!(matches!(
            recorder.stop_recording().await,
            Err(RecordingError::NoSamples)
        ));
        assert!(!path.exists());
        assert_eq!(recorder.phase(), RecordingPhase::Idle);

        // Resources are released; a new session starts cleanly
        let next = recorder.start_recording(size).unwrap();
        assert_ne!(next, path);
        recorder.append_video_frame(frame(size), Duration::from_millis(5), None);
        recorder.stop_recording().await.unwrap();
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let mut status = recorder.watch_status();
        let size = FrameSize::new(8, 8);

        let path = recorder.start_recording(size).unwrap();
        assert!(status.has_changed().unwrap());
        {
            let current = status.borrow_and_update();
            assert_eq!(current.phase, RecordingPhase::Writing);
            assert!(current.is_recording);
            assert_eq!(current.output_path.as_ref(), Some(&path));
        }

        recorder.append_video_frame(frame(size), Duration::ZERO, None);
        recorder.stop_recording().await.unwrap();

        let current = status.borrow_and_update();
        assert_eq!(current.phase, RecordingPhase::Idle);
        assert!(!current.is_recording);
    }

    #[tokio::test]
    async fn test_finish_failure_rolls_back_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(
            dir.path(),
            MemoryWriterOptions {
                fail_finish: true,
                ..Default::default()
            },
        );
        let mut events = recorder.subscribe();
        let size = FrameSize::new(8, 8);

        recorder.start_recording(size).unwrap();
        recorder.append_video_frame(frame(size), Duration::ZERO, None);
        assert!(matches!(
            recorder.stop_recording().await,
            Err(RecordingError::WriterFinishFailed(_))
        ));
        assert_eq!(recorder.phase(), RecordingPhase::Idle);
        assert!(recorder.session().is_none());

        assert!(matches!(events.recv().await, Ok(RecordingEvent::Started { .. })));
        assert!(matches!(events.recv().await, Ok(RecordingEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_start_failure_leaves_idle() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(
            dir.path(),
            MemoryWriterOptions {
                fail_start: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            recorder.start_recording(FrameSize::new(8, 8)),
            Err(RecordingError::WriterStartFailed(_))
        ));
        assert!(recorder.session().is_none());
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_rejected_track_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(
            dir.path(),
            MemoryWriterOptions {
                reject_audio: true,
                ..Default::default()
            },
        );
        let result = recorder.start_recording(FrameSize::new(8, 8));
        assert!(matches!(result, Err(RecordingError::Configuration(_))));
        assert!(recorder.session().is_none());
    }

    #[tokio::test]
    async fn test_writer_backpressure_drops_frames() {
        let dir = tempfile::tempdir().unwrap();
        let options = MemoryWriterOptions::default();
        let ready = options.ready.clone();
        let recorder = coordinator(dir.path(), options);
        let size = FrameSize::new(8, 8);

        recorder.start_recording(size).unwrap();
        ready.store(false, Ordering::SeqCst);
        for i in 0..5u64 {
            recorder.append_video_frame(frame(size), Duration::from_millis(i * 33), None);
        }

        assert!(matches!(
            recorder.stop_recording().await,
            Err(RecordingError::NoSamples)
        ));
        let stats = recorder.stats();
        assert_eq!(stats.video_appended, 0);
        assert_eq!(stats.video_dropped, 5);
    }

    #[tokio::test]
    async fn test_overlay_frames_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(dir.path(), MemoryWriterOptions::default());
        let size = FrameSize::new(8, 8);
        let overlay = OverlayImage::banner(4, 4, 1, [255, 0, 0, 255]).unwrap();

        recorder.start_recording(size).unwrap();
        recorder.append_video_frame(frame(size), Duration::ZERO, Some(overlay.clone()));
        recorder.append_video_frame(frame(size), Duration::from_millis(33), Some(overlay));
        let output = recorder.stop_recording().await.unwrap();

        let manifest = RecordingManifest::read(&output.output_path).unwrap();
        assert_eq!(manifest.video_frames, 2);
        assert_eq!(output.stats.video_appended, 2);
    }

    #[tokio::test]
    async fn test_cancelled_stop_still_releases_session() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = coordinator(
            dir.path(),
            MemoryWriterOptions {
                append_delay: Duration::from_millis(50),
                ..Default::default()
            },
        );
        let size = FrameSize::new(8, 8);

        let first = recorder.start_recording(size).unwrap();
        for i in 0..4u64 {
            recorder.append_video_frame(frame(size), Duration::from_millis(i * 33), None);
        }

        let stop = tokio::time::timeout(Duration::from_millis(10), recorder.stop_recording()).await;
        assert!(stop.is_err());

        // Finalization keeps going without the caller
        let mut status = recorder.watch_status();
        tokio::time::timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.phase == RecordingPhase::Idle),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(recorder.session().is_none());
        assert_eq!(recorder.stats().video_appended, 4);
        assert!(first.exists());

        let next = recorder.start_recording(size).unwrap();
        assert_ne!(next, first);
        recorder.append_video_frame(frame(size), Duration::ZERO, None);
        recorder.stop_recording().await.unwrap();
    }
}
