//! Demo recorder
//!
//! Records the synthetic camera with a warning overlay for a few seconds
//! while simulated telemetry runs, then finalizes through ffmpeg.
//!
//! Usage: illadvised [config.json] [seconds]

use anyhow::Context;
use illadvised_lib::capture::{CaptureMode, CaptureSource, SyntheticCamera, SyntheticCameraConfig};
use illadvised_lib::media::{AudioSample, OverlayImage, VideoFrame};
use illadvised_lib::recorder::FrameSize;
use illadvised_lib::settings::{FlagStore, OnboardingFlag};
use illadvised_lib::telemetry::{format_lines, SensorHub, SimulatedSensors, SimulationMode};
use illadvised_lib::writer::FfmpegWriterFactory;
use illadvised_lib::{RecorderConfig, RecordingCoordinator, RecordingEvent};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const FRAME_SIZE: FrameSize = FrameSize {
    width: 1280,
    height: 720,
};
const BANNER_COLOR: [u8; 4] = [220, 30, 30, 200];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    illadvised_lib::init_tracing();
    tracing::info!("Starting IllAdvised v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => RecorderConfig::load(Path::new(path))
            .with_context(|| format!("failed to load config from {path}"))?,
        None => RecorderConfig::default(),
    };
    let seconds: u64 = match args.get(1) {
        Some(value) => value.parse().context("seconds must be a whole number")?,
        None => 5,
    };

    run_onboarding(&config)?;

    let hub = SensorHub::new();
    let sensors = SimulatedSensors::start(hub.clone(), SimulationMode::Calm);

    let overlay = match &config.overlay_png {
        Some(path) => OverlayImage::from_png_file(path)
            .with_context(|| format!("failed to load overlay {}", path.display()))?,
        None => OverlayImage::banner(
            FRAME_SIZE.width,
            FRAME_SIZE.height,
            FRAME_SIZE.height / 12,
            BANNER_COLOR,
        )?,
    };

    let factory = Arc::new(FfmpegWriterFactory::new(
        config.ffmpeg_path.clone(),
        config.container,
    ));
    let coordinator = Arc::new(RecordingCoordinator::new(config.clone(), factory));

    let camera = SyntheticCamera::new(SyntheticCameraConfig {
        width: FRAME_SIZE.width,
        height: FRAME_SIZE.height,
        fps: config.video.fps,
        pixel_format: config.video.pixel_format,
        sample_rate: config.audio.sample_rate,
        channels: config.audio.channels,
        ..Default::default()
    });

    let video_target = coordinator.clone();
    camera.set_video_handler(Arc::new(move |frame: VideoFrame, capture_time: Duration| {
        video_target.append_video_frame(frame, capture_time, Some(overlay.clone()));
    }));
    let audio_target = coordinator.clone();
    camera.set_audio_handler(Arc::new(move |sample: AudioSample, capture_time: Duration| {
        audio_target.append_audio_frame(sample, capture_time);
    }));

    let mut events = coordinator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RecordingEvent::Started { output_path } => {
                    tracing::info!("Recording to {:?}", output_path)
                }
                RecordingEvent::Stopped { output_path } => {
                    tracing::info!("Saved {:?}", output_path)
                }
                RecordingEvent::Error(message) => tracing::error!("Recording failed: {}", message),
            }
        }
    });

    let mode = if config.features.enable_multi_cam && camera.supports_dual_capture() {
        CaptureMode::Dual
    } else {
        CaptureMode::Single
    };
    camera.start(mode).await?;

    if let Err(e) = coordinator.start_recording(FRAME_SIZE) {
        camera.stop().await?;
        return Err(e.into());
    }
    sensors.set_mode(SimulationMode::Intense);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    for _ in 0..seconds {
        ticker.tick().await;
        for line in format_lines(&hub.latest()) {
            tracing::info!("{}", line);
        }
    }

    let result = coordinator.stop_recording().await;
    camera.stop().await?;
    sensors.stop();

    let output = result?;
    tracing::info!(
        "Recorded {} ({}, {} ms, {} frames, {} samples dropped)",
        output.output_path.display(),
        output.frame_size,
        output.elapsed_ms,
        output.stats.video_appended,
        output.stats.dropped()
    );

    // Let the event logger drain
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}

fn run_onboarding(config: &RecorderConfig) -> anyhow::Result<()> {
    let flags = FlagStore::open(&config.state_dir())?;

    if config.features.enable_intro_animation && !flags.has_seen_intro() {
        tracing::info!("Welcome to IllAdvised. Record responsibly.");
        flags.set(OnboardingFlag::IntroAnimation, true)?;
    }
    if config.features.enable_charity_prompt && !flags.has_seen_charity_prompt() {
        tracing::info!("Consider donating to an injury prevention charity before you record.");
        flags.set(OnboardingFlag::CharityPrompt, true)?;
    }
    Ok(())
}
