// SPDX-License-Identifier: MIT
//! # Scaling Presets and Plan Computation
//!
//! Computes output dimensions for preview frames. The plan is computed once per
//! input size and reused by the scaler for every frame of that size.
//!
//! ## Design Philosophy
//!
//! 1. **ScaleTarget**: What size constraint to apply (max side length vs exact dimensions)
//! 2. **AspectMode**: Whether to keep the source aspect ratio
//! 3. **ScalePlan**: The computed output parameters for the actual scaling
//!
//! No upscaling: frames smaller than the target are left unchanged, and every
//! side is clamped to at least 1px.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Defines how aspect ratio differences are handled during scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectMode {
    /// Keep original aspect ratio; output fits entirely within target bounds.
    Preserve,
    /// Stretch/squeeze image to exactly match target dimensions.
    Distort,
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
    /// Force output into exact dimensions.
    Exact(Size),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target size constraint used for planning
    pub target: ScaleTarget,
    /// Aspect ratio handling strategy
    pub aspect: AspectMode,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the frame at its original size.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a complete scaling plan from input parameters.
///
/// # Arguments
/// * `input` - Source image dimensions
/// * `target` - Size constraint to apply
/// * `aspect` - How to handle aspect ratio differences
pub fn build_plan(input: Size, target: ScaleTarget, aspect: AspectMode) -> ScalePlan {
    let out = match (target, aspect) {
        (ScaleTarget::MaxLongSide(max_side), AspectMode::Preserve) => {
            let (w, h) = fit_preserve(input, max_side);
            Size { w, h }
        }
        (ScaleTarget::MaxLongSide(max_side), AspectMode::Distort) => Size {
            w: max_side.max(1),
            h: max_side.max(1),
        },
        (ScaleTarget::Exact(out), AspectMode::Preserve) => {
            let (w, h) = fit_within(input, out);
            Size { w, h }
        }
        (ScaleTarget::Exact(out), AspectMode::Distort) => Size {
            w: out.w.max(1),
            h: out.h.max(1),
        },
    };

    ScalePlan {
        input,
        target,
        aspect,
        out,
    }
}

/// Fit image within max_side constraint while preserving aspect ratio.
/// Never upscales.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w.max(1) as f64, input.h.max(1) as f64);
    let long = w.max(h);
    let s = (max_long.max(1) as f64 / long).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Fit image within a bounding box while preserving aspect ratio.
fn fit_within(input: Size, box_: Size) -> (u32, u32) {
    let (w, h) = (input.w.max(1) as f64, input.h.max(1) as f64);
    let (bw, bh) = (box_.w.max(1) as f64, box_.h.max(1) as f64);
    let s = (bw / w).min(bh / h).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}

/// Preview size presets for the live scan feed.
///
/// Smaller previews keep the multipart stream light on phones and slow links;
/// decoding is unaffected because it runs on the full frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PreviewPreset {
    /// 320px longest side
    #[clap(name = "small")]
    Small,
    /// 480px longest side
    #[clap(name = "medium")]
    Medium,
    /// 640px longest side
    #[clap(name = "large")]
    Large,
    /// Stream frames at the capture resolution
    #[clap(name = "native")]
    Native,
}

impl PreviewPreset {
    /// Longest preview side in pixels, `None` for native resolution.
    pub fn max_side(self) -> Option<u32> {
        match self {
            PreviewPreset::Small => Some(320),
            PreviewPreset::Medium => Some(480),
            PreviewPreset::Large => Some(640),
            PreviewPreset::Native => None,
        }
    }

    /// Convert preset to the corresponding ScaleTarget for plan computation.
    pub fn to_target(self) -> Option<ScaleTarget> {
        self.max_side().map(ScaleTarget::MaxLongSide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserve_clamps_long_side() {
        let plan = build_plan(
            Size { w: 1920, h: 1080 },
            ScaleTarget::MaxLongSide(640),
            AspectMode::Preserve,
        );
        assert_eq!(plan.out, Size { w: 640, h: 360 });
        assert!(!plan.is_identity());
    }

    #[test]
    fn preserve_never_upscales() {
        let plan = build_plan(
            Size { w: 300, h: 200 },
            ScaleTarget::MaxLongSide(640),
            AspectMode::Preserve,
        );
        assert_eq!(plan.out, Size { w: 300, h: 200 });
        assert!(plan.is_identity());
    }

    #[test]
    fn portrait_frames_clamp_height() {
        let plan = build_plan(
            Size { w: 720, h: 1280 },
            ScaleTarget::MaxLongSide(480),
            AspectMode::Preserve,
        );
        assert_eq!(plan.out, Size { w: 270, h: 480 });
    }

    #[test]
    fn exact_preserve_fits_inside_box() {
        let plan = build_plan(
            Size { w: 1000, h: 500 },
            ScaleTarget::Exact(Size { w: 400, h: 400 }),
            AspectMode::Preserve,
        );
        assert_eq!(plan.out, Size { w: 400, h: 200 });
    }

    #[test]
    fn degenerate_sizes_stay_positive() {
        let plan = build_plan(
            Size { w: 0, h: 0 },
            ScaleTarget::MaxLongSide(0),
            AspectMode::Preserve,
        );
        assert!(plan.out.w >= 1 && plan.out.h >= 1);
    }

    #[test]
    fn preset_targets() {
        assert_eq!(PreviewPreset::Large.to_target(), Some(ScaleTarget::MaxLongSide(640)));
        assert_eq!(PreviewPreset::Native.to_target(), None);
    }
}
