//! Overlay compositing for video frames

use crate::media::{OverlayImage, VideoFrame};

/// Draw `overlay` over `frame` at full-frame extent
///
/// Without an overlay the frame is handed back untouched (same buffer).
/// With one, a new buffer of the same size and pixel format is produced; the
/// overlay is stretched to the frame with nearest-neighbor sampling and
/// alpha-blended on top. Returns `None` when the frame cannot be drawn into
/// (planar pixel format or a buffer that does not match its geometry); the
/// caller must drop such frames rather than substitute anything.
pub fn composite(frame: VideoFrame, overlay: Option<&OverlayImage>) -> Option<VideoFrame> {
    let Some(overlay) = overlay else {
        return Some(frame);
    };

    let layout = frame.format().channel_layout()?;
    if !frame.is_well_formed() {
        return None;
    }

    let width = frame.width();
    let height = frame.height();
    let mut pixels = frame.data().to_vec();

    for y in 0..height {
        let overlay_y = (y as u64 * overlay.height() as u64 / height as u64) as u32;
        for x in 0..width {
            let overlay_x = (x as u64 * overlay.width() as u64 / width as u64) as u32;
            let [src_r, src_g, src_b, src_a] = overlay.pixel(overlay_x, overlay_y);
            if src_a == 0 {
                continue;
            }

            let idx = (y as usize * width as usize + x as usize) * 4;
            let px = &mut pixels[idx..idx + 4];
            let alpha = src_a as f32 / 255.0;

            px[layout.r] = blend(src_r, px[layout.r], alpha);
            px[layout.g] = blend(src_g, px[layout.g], alpha);
            px[layout.b] = blend(src_b, px[layout.b], alpha);
            px[layout.a] = (src_a as f32 + px[layout.a] as f32 * (1.0 - alpha))
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }

    Some(VideoFrame::new(width, height, frame.format(), pixels))
}

fn blend(src: u8, dst: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::PixelFormat;

    fn gray_frame(format: PixelFormat) -> VideoFrame {
        VideoFrame::solid(8, 4, format, [100, 100, 100, 255])
    }

    #[test]
    fn test_passthrough_without_overlay() {
        let frame = gray_frame(PixelFormat::Argb);
        let out = composite(frame.clone(), None).unwrap();
        assert!(out.shares_buffer(&frame));
        assert_eq!(out.data(), frame.data());
    }

    #[test]
    fn test_dimensions_preserved_for_any_overlay_size() {
        let frame = gray_frame(PixelFormat::Bgra);
        for (w, h) in [(1, 1), (3, 2), (8, 4), (64, 33)] {
            let overlay = OverlayImage::banner(w, h, h, [0, 0, 0, 128]).unwrap();
            let out = composite(frame.clone(), Some(&overlay)).unwrap();
            assert_eq!((out.width(), out.height()), (8, 4));
            assert_eq!(out.format(), PixelFormat::Bgra);
            assert_eq!(out.data().len(), frame.data().len());
            assert!(!out.shares_buffer(&frame));
        }
    }

    #[test]
    fn test_opaque_overlay_replaces_pixels() {
        let frame = VideoFrame::solid(2, 2, PixelFormat::Argb, [255, 0, 0, 0]);
        let overlay = OverlayImage::from_rgba(1, 1, vec![10, 20, 30, 255]).unwrap();
        let out = composite(frame, Some(&overlay)).unwrap();
        // ARGB: alpha first
        assert_eq!(&out.data()[..4], &[255, 10, 20, 30]);
    }

    #[test]
    fn test_transparent_overlay_leaves_frame_intact() {
        let frame = gray_frame(PixelFormat::Rgba);
        let overlay = OverlayImage::banner(8, 4, 0, [255, 0, 0, 255]).unwrap();
        let out = composite(frame.clone(), Some(&overlay)).unwrap();
        assert_eq!(out.data(), frame.data());
    }

    #[test]
    fn test_half_alpha_blend() {
        let frame = VideoFrame::solid(1, 1, PixelFormat::Rgba, [0, 0, 0, 255]);
        let overlay = OverlayImage::from_rgba(1, 1, vec![255, 255, 255, 128]).unwrap();
        let out = composite(frame, Some(&overlay)).unwrap();
        assert_eq!(out.data(), &[128, 128, 128, 255]);
    }

    #[test]
    fn test_banner_covers_top_rows_only() {
        let frame = VideoFrame::solid(4, 4, PixelFormat::Rgba, [0, 0, 0, 255]);
        let overlay = OverlayImage::banner(4, 4, 1, [255, 0, 0, 255]).unwrap();
        let out = composite(frame, Some(&overlay)).unwrap();
        assert_eq!(&out.data()[..4], &[255, 0, 0, 255]);
        assert_eq!(&out.data()[16..20], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_planar_frame_cannot_be_composited() {
        let frame = VideoFrame::solid(4, 4, PixelFormat::Nv12, [16, 0, 0, 0]);
        let overlay = OverlayImage::banner(4, 4, 4, [255, 0, 0, 255]).unwrap();
        assert!(composite(frame, Some(&overlay)).is_none());
    }

    #[test]
    fn test_malformed_frame_cannot_be_composited() {
        let frame = VideoFrame::new(4, 4, PixelFormat::Argb, vec![0; 7]);
        let overlay = OverlayImage::banner(4, 4, 4, [255, 0, 0, 255]).unwrap();
        assert!(composite(frame, Some(&overlay)).is_none());
    }
}
