// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeAlg, ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};

#[derive(Debug)]
pub enum ScaleError {
    SourceTooSmall,
    BufferTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall => write!(f, "Source buffer smaller than its declared size"),
            ScaleError::BufferTooSmall => write!(f, "Output buffer too small"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Number of bytes an RGB8 image of `size` occupies when tightly packed.
pub fn rgb_len(size: Size) -> usize {
    (size.w as usize) * (size.h as usize) * 3
}

/// Main scaling entry point.
/// `src_rgb` must be tightly packed rows of `src.w * 3` bytes.
/// `dst` must hold at least `plan.out.w * plan.out.h * 3` bytes.
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    src: Size,
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = rgb_len(src);
    let dst_len = rgb_len(plan.out);
    if src_rgb.len() < src_len {
        return Err(ScaleError::SourceTooSmall);
    }
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    if plan.is_identity() {
        dst[..dst_len].copy_from_slice(&src_rgb[..src_len]);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(src.w, src.h, &src_rgb[..src_len])?;
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Bilinear is plenty for a preview and noticeably cheaper than Lanczos.
    let opts = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(fir::FilterType::Bilinear));
    resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

/// Reusable scaler that owns its resizer and output buffer between frames.
pub struct PreviewScaler {
    resizer: Resizer,
    buffer: Vec<u8>,
}

impl Default for PreviewScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewScaler {
    pub fn new() -> Self {
        Self { resizer: Resizer::new(), buffer: Vec::new() }
    }

    /// Scale `src_rgb` according to `plan`, returning a view of the scaled pixels.
    pub fn scale(&mut self, src_rgb: &[u8], plan: &ScalePlan) -> Result<&[u8], ScaleError> {
        let len = rgb_len(plan.out);
        if self.buffer.len() != len {
            self.buffer.resize(len, 0);
        }
        scale_rgb_cpu(&mut self.resizer, src_rgb, plan.input, plan, &mut self.buffer)?;
        Ok(&self.buffer)
    }
}
