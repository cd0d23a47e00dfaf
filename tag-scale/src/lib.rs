// SPDX-License-Identifier: MIT
//! # tag-scale: Preview Frame Scaling for Live Tag Scanning
//!
//! This crate downsizes camera frames before they are JPEG-encoded and pushed
//! to a browser as a live preview. Decoding always runs on the full-resolution
//! frame; only the preview path is scaled.
//!
//! ## Key Components
//!
//! - [`presets`]: Scaling plan computation and preview size presets
//! - [`cpu`]: CPU-based RGB scaling using fast_image_resize (SIMD accelerated)
//!
//! ## Usage Example
//!
//! ```rust
//! use tag_scale::{cpu::scale_rgb_cpu, presets::{build_plan, AspectMode, ScaleTarget, Size}};
//!
//! let input = Size { w: 1280, h: 720 };
//! let plan = build_plan(input, ScaleTarget::MaxLongSide(640), AspectMode::Preserve);
//! assert_eq!((plan.out.w, plan.out.h), (640, 360));
//!
//! let src = vec![0u8; (input.w * input.h * 3) as usize];
//! let mut dst = vec![0u8; (plan.out.w * plan.out.h * 3) as usize];
//! let mut resizer = fast_image_resize::Resizer::new();
//! scale_rgb_cpu(&mut resizer, &src, input, &plan, &mut dst).unwrap();
//! ```

pub mod cpu;
pub mod presets;
