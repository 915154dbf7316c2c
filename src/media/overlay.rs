//! Still overlay images
//!
//! Overlays are stored as straight (non-premultiplied) RGBA regardless of the
//! source they were loaded from.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Overlay loading errors
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG decode error: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("Unsupported PNG color type: {0:?}")]
    UnsupportedColor(png::ColorType),

    #[error("Invalid overlay dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// An RGBA still image drawn over video frames
#[derive(Debug, Clone)]
pub struct OverlayImage {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl OverlayImage {
    /// Wrap straight RGBA pixels
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, OverlayError> {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return Err(OverlayError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    /// Load a PNG file
    pub fn from_png_file(path: &Path) -> Result<Self, OverlayError> {
        let file = std::fs::File::open(path)?;
        let image = Self::from_png(file)?;
        tracing::debug!(
            "Loaded overlay {:?}: {}x{}",
            path,
            image.width,
            image.height
        );
        Ok(image)
    }

    /// Decode a PNG stream, expanding palette and grayscale images to RGBA
    pub fn from_png<R: Read>(source: R) -> Result<Self, OverlayError> {
        let mut decoder = png::Decoder::new(source);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;

        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        let pixels = &buf[..info.buffer_size()];

        let rgba = match info.color_type {
            png::ColorType::Rgba => pixels.to_vec(),
            png::ColorType::Rgb => {
                let mut rgba = Vec::with_capacity(pixels.len() / 3 * 4);
                for chunk in pixels.chunks(3) {
                    rgba.extend_from_slice(chunk);
                    rgba.push(255);
                }
                rgba
            }
            png::ColorType::GrayscaleAlpha => {
                let mut rgba = Vec::with_capacity(pixels.len() * 2);
                for chunk in pixels.chunks(2) {
                    rgba.extend_from_slice(&[chunk[0], chunk[0], chunk[0], chunk[1]]);
                }
                rgba
            }
            png::ColorType::Grayscale => {
                let mut rgba = Vec::with_capacity(pixels.len() * 4);
                for &v in pixels {
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
                rgba
            }
            other => return Err(OverlayError::UnsupportedColor(other)),
        };

        Self::from_rgba(info.width, info.height, rgba)
    }

    /// A transparent image with a solid band across the top
    ///
    /// This is the "recording" warning banner shown over the feed.
    pub fn banner(width: u32, height: u32, band_height: u32, color: [u8; 4]) -> Result<Self, OverlayError> {
        let band_rows = band_height.min(height) as usize;
        let row_len = width as usize * 4;
        let mut rgba = vec![0u8; row_len * height as usize];
        for px in rgba[..row_len * band_rows].chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
        Self::from_rgba(width, height, rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}
