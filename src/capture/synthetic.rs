//! Synthetic capture source
//!
//! Fabricates camera and microphone feeds: moving color bars for the back
//! camera, a warm gradient for the front one, and a quiet tone on the audio
//! track. Used by the demo binary and wherever no real device is available.

use super::traits::{
    AudioDeviceInfo, AudioHandler, CameraInfo, CameraPosition, CaptureError, CaptureMode,
    CaptureSource, Resolution, VideoHandler,
};
use crate::media::{AudioSample, PixelFormat, VideoFrame};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Feed parameters for [`SyntheticCamera`]
#[derive(Debug, Clone)]
pub struct SyntheticCameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: PixelFormat,
    pub sample_rate: u32,
    pub channels: u16,
    /// Length of each delivered audio chunk
    pub audio_chunk: Duration,
    pub tone_hz: f64,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            pixel_format: PixelFormat::Argb,
            sample_rate: 44_100,
            channels: 2,
            audio_chunk: Duration::from_millis(20),
            tone_hz: 440.0,
        }
    }
}

/// A capture source generating test patterns
pub struct SyntheticCamera {
    id: String,
    config: SyntheticCameraConfig,
    video_handler: Arc<RwLock<Option<VideoHandler>>>,
    audio_handler: Arc<RwLock<Option<AudioHandler>>>,
    active_camera: Arc<Mutex<CameraPosition>>,
    mode: Mutex<Option<CaptureMode>>,
    running: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            id: "synthetic".to_string(),
            config,
            video_handler: Arc::new(RwLock::new(None)),
            audio_handler: Arc::new(RwLock::new(None)),
            active_camera: Arc::new(Mutex::new(CameraPosition::Back)),
            mode: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn active_camera(&self) -> CameraPosition {
        *self.active_camera.lock()
    }

    fn spawn_video(&self, mode: CaptureMode, clock: Instant) -> std::io::Result<JoinHandle<()>> {
        let config = self.config.clone();
        let handler = self.video_handler.clone();
        let camera = self.active_camera.clone();
        let running = self.running.clone();
        let interval = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);

        std::thread::Builder::new()
            .name("capture-video".to_string())
            .spawn(move || {
                let mut index: u32 = 0;
                while running.load(Ordering::Acquire) {
                    let due = clock + interval * index;
                    if let Some(wait) = due.checked_duration_since(Instant::now()) {
                        std::thread::sleep(wait);
                    }

                    let position = *camera.lock();
                    let frame = match mode {
                        CaptureMode::Single => test_pattern(&config, position, index),
                        CaptureMode::Dual => dual_pattern(&config, index),
                    };
                    let capture_time = clock.elapsed();
                    let current = handler.read().clone();
                    if let Some(handler) = current {
                        handler(frame, capture_time);
                    }
                    index = index.wrapping_add(1);
                }
            })
    }

    fn spawn_audio(&self, clock: Instant) -> std::io::Result<JoinHandle<()>> {
        let config = self.config.clone();
        let handler = self.audio_handler.clone();
        let running = self.running.clone();

        std::thread::Builder::new()
            .name("capture-audio".to_string())
            .spawn(move || {
                let frames_per_chunk =
                    ((config.audio_chunk.as_secs_f64() * config.sample_rate as f64).round() as u64).max(1);
                let mut frames_sent: u64 = 0;
                while running.load(Ordering::Acquire) {
                    let due = clock
                        + Duration::from_secs_f64(frames_sent as f64 / config.sample_rate as f64);
                    if let Some(wait) = due.checked_duration_since(Instant::now()) {
                        std::thread::sleep(wait);
                    }

                    let sample = tone(&config, frames_sent, frames_per_chunk);
                    let capture_time = clock.elapsed();
                    let current = handler.read().clone();
                    if let Some(handler) = current {
                        handler(sample, capture_time);
                    }
                    frames_sent += frames_per_chunk;
                }
            })
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(SyntheticCameraConfig::default())
    }
}

#[async_trait]
impl CaptureSource for SyntheticCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn cameras(&self) -> Vec<CameraInfo> {
        let resolution = Resolution {
            width: self.config.width,
            height: self.config.height,
        };
        vec![
            CameraInfo {
                id: "synthetic-back".to_string(),
                name: "Synthetic Back Camera".to_string(),
                position: CameraPosition::Back,
                supported_resolutions: vec![resolution],
            },
            CameraInfo {
                id: "synthetic-front".to_string(),
                name: "Synthetic Front Camera".to_string(),
                position: CameraPosition::Front,
                supported_resolutions: vec![resolution],
            },
        ]
    }

    fn microphones(&self) -> Vec<AudioDeviceInfo> {
        vec![AudioDeviceInfo {
            id: "synthetic-mic".to_string(),
            name: "Synthetic Tone".to_string(),
            is_default: true,
        }]
    }

    fn supports_dual_capture(&self) -> bool {
        true
    }

    fn set_video_handler(&self, handler: VideoHandler) {
        *self.video_handler.write() = Some(handler);
    }

    fn set_audio_handler(&self, handler: AudioHandler) {
        *self.audio_handler.write() = Some(handler);
    }

    async fn start(&self, mode: CaptureMode) -> Result<(), CaptureError> {
        if mode == CaptureMode::Dual && !self.supports_dual_capture() {
            return Err(CaptureError::Unsupported("dual capture".to_string()));
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::AlreadyRunning);
        }

        let clock = Instant::now();
        let spawned = self
            .spawn_video(mode, clock)
            .and_then(|video| Ok((video, self.spawn_audio(clock)?)));
        let (video, audio) = match spawned {
            Ok(threads) => threads,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        *self.mode.lock() = Some(mode);
        self.threads.lock().extend([video, audio]);

        tracing::info!(
            "Synthetic capture started: {}x{} @ {}fps, {:?}",
            self.config.width,
            self.config.height,
            self.config.fps,
            mode
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), CaptureError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(CaptureError::NotRunning);
        }

        let threads: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        let _ = tokio::task::spawn_blocking(move || {
            for thread in threads {
                let _ = thread.join();
            }
        })
        .await;

        *self.mode.lock() = None;
        tracing::info!("Synthetic capture stopped");
        Ok(())
    }

    fn switch_camera(&self) -> Result<CameraPosition, CaptureError> {
        if *self.mode.lock() == Some(CaptureMode::Dual) {
            return Err(CaptureError::Unsupported(
                "camera switching while both cameras run".to_string(),
            ));
        }
        let mut active = self.active_camera.lock();
        *active = active.flipped();
        tracing::debug!("Switched to {:?} camera", *active);
        Ok(*active)
    }
}

fn write_pixel(data: &mut [u8], idx: usize, format: PixelFormat, rgb: [u8; 3]) {
    if let Some(layout) = format.channel_layout() {
        data[idx + layout.r] = rgb[0];
        data[idx + layout.g] = rgb[1];
        data[idx + layout.b] = rgb[2];
        data[idx + layout.a] = 255;
    }
}

fn pattern_color(position: CameraPosition, x: u32, y: u32, width: u32, height: u32, index: u32) -> [u8; 3] {
    match position {
        CameraPosition::Back => {
            let shift = (index as u64 * 4) % width.max(1) as u64;
            let column = (x as u64 + shift) % width.max(1) as u64;
            BARS[(column * BARS.len() as u64 / width.max(1) as u64) as usize]
        }
        CameraPosition::Front => {
            let r = 160 + (x * 95 / width.max(1)) as u8;
            let g = 90 + (y * 80 / height.max(1)) as u8;
            let b = ((index % 64) * 2) as u8;
            [r, g, b]
        }
    }
}

/// Single-camera test frame
pub fn test_pattern(config: &SyntheticCameraConfig, position: CameraPosition, index: u32) -> VideoFrame {
    let (width, height, format) = (config.width, config.height, config.pixel_format);
    if format.channel_layout().is_none() {
        return VideoFrame::solid(width, height, format, [128, 0, 0, 0]);
    }

    let mut data = vec![0u8; format.buffer_len(width, height)];
    for y in 0..height {
        for x in 0..width {
            let idx = (y as usize * width as usize + x as usize) * 4;
            let rgb = pattern_color(position, x, y, width, height, index);
            write_pixel(&mut data, idx, format, rgb);
        }
    }
    VideoFrame::new(width, height, format, data)
}

/// Back camera full frame with the front camera inset bottom-right
pub fn dual_pattern(config: &SyntheticCameraConfig, index: u32) -> VideoFrame {
    let (width, height, format) = (config.width, config.height, config.pixel_format);
    let back = test_pattern(config, CameraPosition::Back, index);
    if format.channel_layout().is_none() {
        return back;
    }

    let inset_w = width / 4;
    let inset_h = height / 4;
    let margin = width / 32;
    let left = width.saturating_sub(inset_w + margin);
    let top = height.saturating_sub(inset_h + margin);

    let mut data = back.data().to_vec();
    for y in top..(top + inset_h).min(height) {
        for x in left..(left + inset_w).min(width) {
            let idx = (y as usize * width as usize + x as usize) * 4;
            let rgb = pattern_color(CameraPosition::Front, x - left, y - top, inset_w, inset_h, index);
            write_pixel(&mut data, idx, format, rgb);
        }
    }
    VideoFrame::new(width, height, format, data)
}

fn tone(config: &SyntheticCameraConfig, first_frame: u64, frames: u64) -> AudioSample {
    let channels = config.channels.max(1) as usize;
    let mut data = Vec::with_capacity(frames as usize * channels);
    for n in first_frame..first_frame + frames {
        let t = n as f64 / config.sample_rate as f64;
        let value = ((TAU * config.tone_hz * t).sin() * 0.1 * i16::MAX as f64) as i16;
        data.extend(std::iter::repeat(value).take(channels));
    }
    AudioSample::new(config.sample_rate, config.channels, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn small_config() -> SyntheticCameraConfig {
        SyntheticCameraConfig {
            width: 32,
            height: 16,
            fps: 100,
            audio_chunk: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_patterns_are_well_formed() {
        let config = small_config();
        let back = test_pattern(&config, CameraPosition::Back, 0);
        let front = test_pattern(&config, CameraPosition::Front, 0);
        assert!(back.is_well_formed());
        assert!(front.is_well_formed());
        assert_ne!(back.data(), front.data());
        // Alpha is opaque in ARGB
        assert_eq!(back.data()[0], 255);
    }

    #[test]
    fn test_dual_pattern_has_inset() {
        let config = small_config();
        let single = test_pattern(&config, CameraPosition::Back, 3);
        let dual = dual_pattern(&config, 3);
        assert_eq!(dual.data().len(), single.data().len());
        assert_ne!(dual.data(), single.data());
    }

    #[test]
    fn test_tone_is_continuous_chunks() {
        let config = small_config();
        let first = tone(&config, 0, 441);
        assert_eq!(first.frames(), 441);
        assert_eq!(first.data()[0], 0);
        assert_eq!(first.data()[0], first.data()[1]);
    }

    #[test]
    fn test_switch_camera() {
        let camera = SyntheticCamera::new(small_config());
        assert_eq!(camera.active_camera(), CameraPosition::Back);
        assert_eq!(camera.switch_camera().unwrap(), CameraPosition::Front);
        assert_eq!(camera.switch_camera().unwrap(), CameraPosition::Back);
    }

    #[tokio::test]
    async fn test_delivers_frames_to_handlers() {
        let camera = SyntheticCamera::new(small_config());
        let frames = Arc::new(AtomicUsize::new(0));
        let chunks = Arc::new(AtomicUsize::new(0));

        let counter = frames.clone();
        camera.set_video_handler(Arc::new(move |frame: VideoFrame, _: Duration| {
            assert_eq!(frame.width(), 32);
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = chunks.clone();
        camera.set_audio_handler(Arc::new(move |_: AudioSample, _: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        camera.start(CaptureMode::Dual).await.unwrap();
        assert!(matches!(
            camera.start(CaptureMode::Single).await,
            Err(CaptureError::AlreadyRunning)
        ));
        assert!(camera.switch_camera().is_err());
        tokio::time::sleep(Duration::from_millis(150)).await;
        camera.stop().await.unwrap();

        assert!(frames.load(Ordering::SeqCst) > 0);
        assert!(chunks.load(Ordering::SeqCst) > 0);
        assert!(matches!(camera.stop().await, Err(CaptureError::NotRunning)));
    }
}
