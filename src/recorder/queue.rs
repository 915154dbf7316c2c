//! Recording queue
//!
//! A dedicated serial thread owns the [`WriteSession`]. Capture callbacks
//! submit samples without blocking; each track may have at most
//! `depth` samples in flight, anything beyond that is dropped.

use super::compositor::composite;
use super::error::{RecordingError, RecordingResult};
use super::state::RecordingStats;
use crate::media::{AudioSample, MediaKind, OverlayImage, SampleBuffer, VideoFrame};
use crate::writer::{AppendOutcome, WriteSession};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const NO_ORIGIN: u64 = u64::MAX;

enum QueueCommand {
    Video {
        frame: VideoFrame,
        capture_time: Duration,
        overlay: Option<OverlayImage>,
    },
    Audio {
        sample: AudioSample,
        capture_time: Duration,
    },
    Finish(oneshot::Sender<RecordingResult<PathBuf>>),
}

/// Counters shared between submitters and the queue thread
#[derive(Default)]
struct QueueShared {
    in_flight: [AtomicUsize; 2],
    appended: [AtomicU64; 2],
    dropped: [AtomicU64; 2],
    origin_nanos: AtomicU64,
}

impl QueueShared {
    fn new() -> Self {
        let shared = Self::default();
        shared.origin_nanos.store(NO_ORIGIN, Ordering::Relaxed);
        shared
    }

    fn drop_sample(&self, kind: MediaKind) {
        self.dropped[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> RecordingStats {
        RecordingStats {
            video_appended: self.appended[0].load(Ordering::Relaxed),
            audio_appended: self.appended[1].load(Ordering::Relaxed),
            video_dropped: self.dropped[0].load(Ordering::Relaxed),
            audio_dropped: self.dropped[1].load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running recording queue
pub(crate) struct SampleQueue {
    tx: mpsc::UnboundedSender<QueueCommand>,
    shared: Arc<QueueShared>,
    depth: usize,
    worker: Option<JoinHandle<()>>,
}

impl SampleQueue {
    /// Move a started session onto a new queue thread
    pub(crate) fn spawn(session: WriteSession, depth: usize) -> RecordingResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(QueueShared::new());

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("recording-queue".to_string())
            .spawn(move || run_queue(session, rx, worker_shared))
            .map_err(|e| RecordingError::WriterStartFailed(format!("failed to spawn recording queue: {e}")))?;

        Ok(Self {
            tx,
            shared,
            depth: depth.max(1),
            worker: Some(worker),
        })
    }

    /// Reserve an in-flight slot for `kind`, or count a drop
    fn reserve(&self, kind: MediaKind) -> bool {
        let slot = &self.shared.in_flight[kind.index()];
        let reserved = slot
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.depth).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            self.shared.drop_sample(kind);
            tracing::trace!("Recording queue busy, dropping {:?} sample", kind);
        }
        reserved
    }

    fn submit(&self, kind: MediaKind, command: QueueCommand) -> bool {
        if !self.reserve(kind) {
            return false;
        }
        if self.tx.send(command).is_err() {
            self.shared.in_flight[kind.index()].fetch_sub(1, Ordering::AcqRel);
            self.shared.drop_sample(kind);
            return false;
        }
        true
    }

    /// Hand a video frame to the queue without blocking
    pub(crate) fn submit_video(
        &self,
        frame: VideoFrame,
        capture_time: Duration,
        overlay: Option<OverlayImage>,
    ) -> bool {
        self.submit(
            MediaKind::Video,
            QueueCommand::Video {
                frame,
                capture_time,
                overlay,
            },
        )
    }

    /// Hand an audio chunk to the queue without blocking
    pub(crate) fn submit_audio(&self, sample: AudioSample, capture_time: Duration) -> bool {
        self.submit(
            MediaKind::Audio,
            QueueCommand::Audio {
                sample,
                capture_time,
            },
        )
    }

    pub(crate) fn stats(&self) -> RecordingStats {
        self.shared.stats()
    }

    pub(crate) fn time_origin(&self) -> Option<Duration> {
        match self.shared.origin_nanos.load(Ordering::Acquire) {
            NO_ORIGIN => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }

    /// Finalize the session and wait for the queue thread to exit
    ///
    /// Samples already queued are written before finalization starts, so the
    /// returned counters are final.
    pub(crate) async fn finish(mut self) -> (RecordingResult<PathBuf>, RecordingStats) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let result = if self.tx.send(QueueCommand::Finish(reply_tx)).is_err() {
            Err(RecordingError::WriterFinishFailed(
                "recording queue exited early".to_string(),
            ))
        } else {
            reply_rx.await.unwrap_or_else(|_| {
                Err(RecordingError::WriterFinishFailed(
                    "recording queue dropped the finish request".to_string(),
                ))
            })
        };

        if let Some(worker) = self.worker.take() {
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                tracing::warn!("Recording queue thread did not exit cleanly");
            }
        }

        (result, self.shared.stats())
    }
}

fn run_queue(
    mut session: WriteSession,
    mut rx: mpsc::UnboundedReceiver<QueueCommand>,
    shared: Arc<QueueShared>,
) {
    tracing::debug!("Recording queue started for {:?}", session.target());

    while let Some(command) = rx.blocking_recv() {
        let (kind, sample) = match command {
            QueueCommand::Video {
                frame,
                capture_time,
                overlay,
            } => match composite(frame, overlay.as_ref()) {
                Some(frame) => (MediaKind::Video, SampleBuffer::video(frame, capture_time)),
                None => {
                    tracing::trace!("Compositing failed, dropping frame at {:?}", capture_time);
                    shared.in_flight[0].fetch_sub(1, Ordering::AcqRel);
                    shared.drop_sample(MediaKind::Video);
                    continue;
                }
            },
            QueueCommand::Audio {
                sample,
                capture_time,
            } => (MediaKind::Audio, SampleBuffer::audio(sample, capture_time)),
            QueueCommand::Finish(reply) => {
                let stats = shared.stats();
                tracing::debug!(
                    "Finishing session: {} video / {} audio samples, {} dropped",
                    stats.video_appended,
                    stats.audio_appended,
                    stats.dropped()
                );
                session.finish(move |result| {
                    let _ = reply.send(result);
                });
                return;
            }
        };

        match session.append(sample) {
            AppendOutcome::Appended { .. } => {
                shared.appended[kind.index()].fetch_add(1, Ordering::Relaxed);
                if let Some(origin) = session.time_origin() {
                    shared
                        .origin_nanos
                        .store(origin.as_nanos() as u64, Ordering::Release);
                }
            }
            AppendOutcome::Dropped(reason) => {
                tracing::trace!("Dropped {:?} sample: {:?}", kind, reason);
                shared.drop_sample(kind);
            }
        }
        shared.in_flight[kind.index()].fetch_sub(1, Ordering::AcqRel);
    }

    // Every handle went away without finishing; the session is abandoned
    tracing::warn!("Recording queue closed without finishing {:?}", session.target());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PixelFormat;
    use crate::writer::memory::{MemoryWriterFactory, MemoryWriterOptions, RecordingManifest};
    use crate::writer::{AudioTrackSettings, ContainerFormat, VideoTrackSettings, WriterSettings};

    fn started_session(factory: &MemoryWriterFactory, target: &std::path::Path) -> WriteSession {
        let settings = WriterSettings {
            container: ContainerFormat::Mp4,
            video: VideoTrackSettings {
                codec: "h264".to_string(),
                width: 4,
                height: 4,
                bitrate: 1_000_000,
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
        };
        let mut session = WriteSession::configure(factory, target, &settings).unwrap();
        session.start().unwrap();
        session
    }

    fn frame() -> VideoFrame {
        VideoFrame::solid(4, 4, PixelFormat::Argb, [255, 10, 10, 10])
    }

    #[tokio::test]
    async fn test_queue_writes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mp4");
        let factory = MemoryWriterFactory::default();
        let queue = SampleQueue::spawn(started_session(&factory, &target), 64).unwrap();

        for i in 0..10u64 {
            assert!(queue.submit_video(frame(), Duration::from_millis(100 + i * 33), None));
        }
        let path = queue.finish().await.0.unwrap();

        let manifest = RecordingManifest::read(&path).unwrap();
        assert_eq!(manifest.video_frames, 10);
    }

    #[tokio::test]
    async fn test_busy_queue_drops_samples() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::new(MemoryWriterOptions {
            append_delay: Duration::from_millis(50),
            ..Default::default()
        });
        let queue = SampleQueue::spawn(started_session(&factory, &dir.path().join("out.mp4")), 1).unwrap();

        let accepted = (0..10u64)
            .filter(|i| queue.submit_video(frame(), Duration::from_millis(i * 33), None))
            .count();
        assert!(accepted < 10);
        assert!(queue.stats().video_dropped >= 8);

        let (result, stats) = queue.finish().await;
        result.unwrap();
        assert_eq!(stats.video_appended + stats.video_dropped, 10);
    }

    #[tokio::test]
    async fn test_failed_composite_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::default();
        let queue = SampleQueue::spawn(started_session(&factory, &dir.path().join("out.mp4")), 8).unwrap();

        let overlay = OverlayImage::banner(4, 4, 2, [255, 0, 0, 255]).unwrap();
        let planar = VideoFrame::solid(4, 4, PixelFormat::Nv12, [16, 0, 0, 0]);
        queue.submit_video(planar, Duration::ZERO, Some(overlay));

        let (result, stats) = queue.finish().await;
        assert!(matches!(result, Err(RecordingError::NoSamples)));
        assert_eq!(stats.video_dropped, 1);
    }
}
