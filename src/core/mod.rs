//! # Core Frame Types
//!
//! Shared frame representation passed from capture sources through decoding
//! and preview encoding. Pixel buffers are reference counted so a frame can be
//! handed to the decoder and the preview encoder without copying.

pub mod frame;

pub use frame::RgbFrame;
pub use tag_scale::presets::Size;
