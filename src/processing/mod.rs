//! # Processing Module
//!
//! Per-frame work done by the scan loop: looking for a tag and encoding the
//! preview that is streamed to the operator.

pub mod processing;

pub use processing::{FrameDecoder, PreviewEncoder, PreviewFrame, QrDecoder};
