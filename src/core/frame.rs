//! Packed RGB8 frames.

use std::sync::Arc;

use image::RgbImage;
use tag_scale::cpu::rgb_len;
use tag_scale::presets::Size;

use crate::error::{TagError, TagResult};

/// One captured frame, tightly packed RGB8, row-major, no padding.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl RgbFrame {
    /// Wrap a pixel buffer, checking that it matches the declared size.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> TagResult<Self> {
        let expected = rgb_len(Size { w: width, h: height });
        if width == 0 || height == 0 || data.len() != expected {
            return Err(TagError::frame_capture(format!(
                "frame buffer holds {} bytes, {}x{} RGB needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }

        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }

    /// Integer Rec. 601 luma of the pixel at (`x`, `y`).
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let idx = (y * self.width as usize + x) * 3;
        let r = self.data[idx] as u32;
        let g = self.data[idx + 1] as u32;
        let b = self.data[idx + 2] as u32;
        ((r * 299 + g * 587 + b * 114) / 1000) as u8
    }
}

impl From<RgbImage> for RgbFrame {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: Arc::new(image.into_raw()),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(RgbFrame::new(vec![0; 11], 2, 2).is_err());
        assert!(RgbFrame::new(Vec::new(), 0, 0).is_err());
        assert!(RgbFrame::new(vec![0; 12], 2, 2).is_ok());
    }

    #[test]
    fn luma_weights() {
        let frame = RgbFrame::new(vec![255, 255, 255, 0, 0, 0, 255, 0, 0], 3, 1).unwrap();
        assert_eq!(frame.luma(0, 0), 255);
        assert_eq!(frame.luma(1, 0), 0);
        assert_eq!(frame.luma(2, 0), 76);
    }

    #[test]
    fn converts_from_image_buffer() {
        let image = RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        let frame = RgbFrame::from(image);
        assert_eq!(frame.size(), Size { w: 4, h: 2 });
        assert_eq!(frame.data.len(), 24);
    }
}
