//! Media sample types
//!
//! Raw video frames and PCM audio chunks as delivered by a capture source,
//! plus the timestamped envelope handed to the container writer.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Pixel layout of a raw video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 32-bit, alpha first (the native camera layout)
    Argb,
    /// 32-bit, blue first
    Bgra,
    /// 32-bit, red first
    Rgba,
    /// Planar 4:2:0, luma plane followed by interleaved chroma
    Nv12,
}

/// Byte offsets of the red, green, blue and alpha channels within a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub r: usize,
    pub g: usize,
    pub b: usize,
    pub a: usize,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Argb | PixelFormat::Bgra | PixelFormat::Rgba => Some(4),
            PixelFormat::Nv12 => None,
        }
    }

    /// Expected buffer length for a frame of the given size
    pub fn buffer_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Nv12 => pixels + pixels / 2,
            _ => pixels * 4,
        }
    }

    /// Channel layout for formats that can be alpha-blended in place
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        match self {
            PixelFormat::Argb => Some(ChannelLayout { a: 0, r: 1, g: 2, b: 3 }),
            PixelFormat::Bgra => Some(ChannelLayout { b: 0, g: 1, r: 2, a: 3 }),
            PixelFormat::Rgba => Some(ChannelLayout { r: 0, g: 1, b: 2, a: 3 }),
            PixelFormat::Nv12 => None,
        }
    }

    /// FFmpeg `-pixel_format` name
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            PixelFormat::Argb => "argb",
            PixelFormat::Bgra => "bgra",
            PixelFormat::Rgba => "rgba",
            PixelFormat::Nv12 => "nv12",
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Argb
    }
}

/// Which track a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub(crate) fn index(&self) -> usize {
        match self {
            MediaKind::Video => 0,
            MediaKind::Audio => 1,
        }
    }
}

/// A raw video frame
///
/// The pixel buffer is shared, so cloning a frame never copies pixels.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// A frame filled with a single packed pixel value
    pub fn solid(width: u32, height: u32, format: PixelFormat, pixel: [u8; 4]) -> Self {
        let data = match format.bytes_per_pixel() {
            Some(_) => pixel
                .iter()
                .copied()
                .cycle()
                .take(format.buffer_len(width, height))
                .collect(),
            None => vec![pixel[0]; format.buffer_len(width, height)],
        };
        Self::new(width, height, format, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the buffer length matches the frame geometry
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.format.buffer_len(self.width, self.height)
    }

    /// Whether both frames point at the same pixel buffer
    pub fn shares_buffer(&self, other: &VideoFrame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// A chunk of interleaved signed 16-bit PCM
#[derive(Debug, Clone)]
pub struct AudioSample {
    sample_rate: u32,
    channels: u16,
    data: Arc<[i16]>,
}

impl AudioSample {
    pub fn new(sample_rate: u32, channels: u16, data: Vec<i16>) -> Self {
        Self {
            sample_rate,
            channels,
            data: data.into(),
        }
    }

    /// A chunk of digital silence covering `duration`
    pub fn silence(sample_rate: u32, channels: u16, duration: Duration) -> Self {
        let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        Self::new(sample_rate, channels, vec![0; frames * channels as usize])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn data(&self) -> &[i16] {
        &self.data
    }

    /// Number of sample frames (one value per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.data.len() / self.channels as usize
    }

    /// Playback duration of this chunk
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Payload of a [`SampleBuffer`]
#[derive(Debug, Clone)]
pub enum SamplePayload {
    Video(VideoFrame),
    Audio(AudioSample),
}

/// A media chunk tagged with the capture clock time it was taken at
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Capture clock timestamp; the write session turns it into a
    /// presentation timestamp relative to its time origin
    pub capture_time: Duration,
    pub payload: SamplePayload,
}

impl SampleBuffer {
    pub fn video(frame: VideoFrame, capture_time: Duration) -> Self {
        Self {
            capture_time,
            payload: SamplePayload::Video(frame),
        }
    }

    pub fn audio(sample: AudioSample, capture_time: Duration) -> Self {
        Self {
            capture_time,
            payload: SamplePayload::Audio(sample),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self.payload {
            SamplePayload::Video(_) => MediaKind::Video,
            SamplePayload::Audio(_) => MediaKind::Audio,
        }
    }
}
