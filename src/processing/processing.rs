//! # Frame Processing
//!
//! The two per-frame stages of a scan.
//!
//! ## Architecture
//!
//! 1. **FrameDecoder Trait**: Looks for a tag in a frame. "Nothing found" is
//!    `None`, never an error.
//! 2. **QrDecoder**: `rqrr` based implementation working on the luma plane.
//! 3. **PreviewEncoder**: Downscales with `tag_scale` and compresses to JPEG.
//!
//! Both stages borrow the frame; the pixel buffer is shared with the caller.

// External crate imports
use bytes::Bytes;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tag_scale::cpu::PreviewScaler;
use tag_scale::presets::{AspectMode, ScaleTarget, build_plan};

// Internal module imports
use crate::core::RgbFrame;
use crate::error::{TagError, TagResult};

/// Default JPEG quality for preview frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Looks for a machine-readable tag in a frame.
pub trait FrameDecoder: Send {
    /// Payload of the first tag found, or `None` when no tag is readable.
    fn decode(&mut self, frame: &RgbFrame) -> Option<String>;
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for QrDecoder {
    fn decode(&mut self, frame: &RgbFrame) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width as usize,
            frame.height as usize,
            |x, y| frame.luma(x, y),
        );

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_, content)) => Some(content),
                Err(e) => {
                    tracing::trace!(error = %e, "grid detected but not decodable");
                    None
                }
            })
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
    }
}

/// JPEG-encoded preview of one captured frame.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
    /// Position of the source frame in the scan, starting at 0.
    pub sequence: u64,
}

/// Downscales and JPEG-encodes frames for streaming.
pub struct PreviewEncoder {
    scaler: PreviewScaler,
    target: Option<ScaleTarget>,
    quality: u8,
}

impl Default for PreviewEncoder {
    fn default() -> Self {
        Self::new(None, DEFAULT_JPEG_QUALITY)
    }
}

impl PreviewEncoder {
    /// `target` of `None` keeps frames at native size. Quality is clamped to 1..=100.
    pub fn new(target: Option<ScaleTarget>, quality: u8) -> Self {
        Self {
            scaler: PreviewScaler::new(),
            target,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn encode(&mut self, frame: &RgbFrame, sequence: u64) -> TagResult<PreviewFrame> {
        let plan = self
            .target
            .map(|target| build_plan(frame.size(), target, AspectMode::Preserve))
            .filter(|plan| !plan.is_identity());

        let (pixels, width, height): (&[u8], u32, u32) = match plan {
            Some(plan) => {
                let scaled = self.scaler.scale(&frame.data, &plan).map_err(|e| {
                    TagError::encoding("preview_scale", e.to_string())
                        .with_operation("encode preview")
                })?;
                (scaled, plan.out.w, plan.out.h)
            }
            None => (frame.data.as_slice(), frame.width, frame.height),
        };

        let mut jpeg = Vec::with_capacity(pixels.len() / 8);
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode(pixels, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| {
                TagError::encoding("preview_jpeg", e.to_string()).with_operation("encode preview")
            })?;

        Ok(PreviewFrame {
            jpeg: Bytes::from(jpeg),
            width,
            height,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    fn qr_frame(text: &str) -> RgbFrame {
        let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
        let gray: GrayImage = code
            .render::<Luma<u8>>()
            .min_dimensions(200, 200)
            .build();
        let rgb = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            image::Rgb([v, v, v])
        });
        RgbFrame::from(rgb)
    }

    #[test]
    fn decodes_rendered_qr() {
        let mut decoder = QrDecoder::new();
        let payload = decoder.decode(&qr_frame("Produto: Camisa, Tamanho: M"));
        assert_eq!(payload.as_deref(), Some("Produto: Camisa, Tamanho: M"));
    }

    #[test]
    fn blank_frame_yields_none() {
        let frame = RgbFrame::from(RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255])));
        assert_eq!(QrDecoder::new().decode(&frame), None);
    }

    #[test]
    fn preview_is_downscaled_jpeg() {
        let frame = RgbFrame::from(RgbImage::from_pixel(640, 480, image::Rgb([90, 120, 200])));
        let mut encoder = PreviewEncoder::new(Some(ScaleTarget::MaxLongSide(320)), 70);
        let preview = encoder.encode(&frame, 7).unwrap();

        assert_eq!((preview.width, preview.height), (320, 240));
        assert_eq!(preview.sequence, 7);
        assert_eq!(&preview.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn native_preview_keeps_size() {
        let frame = RgbFrame::from(RgbImage::from_pixel(32, 16, image::Rgb([0, 0, 0])));
        let preview = PreviewEncoder::default().encode(&frame, 0).unwrap();
        assert_eq!((preview.width, preview.height), (32, 16));
    }
}
