//! # Scan Session Management
//!
//! Runs one scan: pull frames from a capture source, look for a tag in each,
//! and stream a preview of every frame that did not contain one. Configured
//! through a builder, executed as a single task.
//!
//! ## Architecture
//!
//! 1. **CaptureSource Trait**: Abstract interface for frame sources
//! 2. **ScanSession**: Owns the source, decoder and preview encoder for one scan
//! 3. **ScanSessionBuilder**: Fluent API for session configuration
//! 4. **ScanHandle**: Caller side of a spawned scan (previews, completion, cancel)
//!
//! ## Loop
//!
//! ```text
//!            ┌──────────── preview sent ◀──── EMIT ◀──── no tag ───┐
//!            ▼                                                     │
//!   ──▶ ACQUIRE ──── frame ────────────────────────────────▶ DECODE ──── tag ──▶ Found
//!            │
//!            └── failure past the bound ──▶ DeviceUnavailable
//! ```
//!
//! Cancellation (token or dropped preview receiver) ends the loop from any
//! state with `Cancelled`. The source is shut down on every exit path.
//!
//! ## Delivery
//!
//! Previews go through a bounded channel and are awaited, so each non-matching
//! frame yields exactly one preview and a slow consumer slows the loop instead
//! of losing frames. The final outcome is delivered once, through a oneshot.

// Standard library imports
use std::time::{Duration, Instant};

// External crate imports
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// Internal module imports
use crate::core::{RgbFrame, Size};
use crate::error::{Retryable, TagError, TagResult};
use crate::processing::{FrameDecoder, PreviewEncoder, PreviewFrame, QrDecoder};

/// Abstract interface for frame capture sources.
/// Enables pluggable capture backends (native camera, HTTP snapshots, files).
#[async_trait]
pub trait CaptureSource: Send {
    /// Opens the device. Failing here means the device is unavailable.
    async fn initialize(&mut self) -> TagResult<()>;

    /// Grabs the next frame.
    ///
    /// An error is a single failed read; the session decides when repeated
    /// failures mean the device is gone.
    async fn capture_frame(&mut self) -> TagResult<RgbFrame>;

    /// Native resolution, known after `initialize`.
    fn input_size(&self) -> Size;

    /// Human-readable device name used in logs and errors.
    fn describe(&self) -> String;

    /// Releases the device. Called exactly once per session.
    async fn shutdown(&mut self) -> TagResult<()>;
}

/// Bounds on how long a scan tolerates a failing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Consecutive failed reads before the device is declared unavailable.
    pub max_consecutive_failures: u32,
    /// Longest uninterrupted stretch of failed reads.
    pub failure_timeout: Duration,
    /// Pause between frames.
    pub frame_interval: Duration,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 300,
            failure_timeout: Duration::from_secs(10),
            frame_interval: Duration::from_millis(33),
        }
    }
}

/// How a scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    /// A tag was decoded; holds its trimmed, non-empty payload.
    Found(String),
    /// Stopped by the caller or because nobody was watching the previews.
    Cancelled,
    /// The device could not be opened or kept failing.
    DeviceUnavailable(TagError),
}

impl ScanOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ScanOutcome::Found(_))
    }
}

/// Caller side of a spawned scan.
pub struct ScanHandle {
    /// One preview per frame that contained no tag, in capture order.
    pub previews: mpsc::Receiver<PreviewFrame>,
    /// Resolves once with the final outcome.
    pub completion: oneshot::Receiver<ScanOutcome>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

/// One configured scan.
pub struct ScanSession {
    source: Box<dyn CaptureSource>,
    decoder: Box<dyn FrameDecoder>,
    preview: PreviewEncoder,
    limits: ScanLimits,
    cancel: CancellationToken,
}

impl ScanSession {
    /// Create a new scan session using the builder pattern.
    pub fn builder() -> ScanSessionBuilder {
        ScanSessionBuilder::new()
    }

    /// Run the scan on a new task and hand back its channels.
    ///
    /// `preview_capacity` bounds how many previews may wait unread.
    pub fn spawn(self, preview_capacity: usize) -> ScanHandle {
        let (preview_tx, preview_rx) = mpsc::channel(preview_capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel();
        let cancel = self.cancel.clone();

        // The preview stream ends only after the outcome is ready, so a viewer
        // that sees it close can collect the result right away.
        let task = tokio::spawn(async move {
            let outcome = self.run(preview_tx.clone()).await;
            if done_tx.send(outcome).is_err() {
                tracing::debug!("scan outcome dropped, nobody waiting");
            }
            drop(preview_tx);
        });

        ScanHandle {
            previews: preview_rx,
            completion: done_rx,
            cancel,
            task,
        }
    }

    /// Execute the scan loop until a tag is found, the device gives up, or the
    /// scan is cancelled.
    pub async fn run(mut self, previews: mpsc::Sender<PreviewFrame>) -> ScanOutcome {
        let device = self.source.describe();

        if let Err(e) = self.source.initialize().await {
            tracing::error!(device = %device, error = %e, "capture device failed to open");
            self.shutdown_source(&device).await;
            return ScanOutcome::DeviceUnavailable(
                TagError::device_unavailable(device, 0, e.to_string())
                    .with_operation("open capture device"),
            );
        }

        let input = self.source.input_size();
        tracing::info!(device = %device, width = input.w, height = input.h, "scan started");

        let outcome = self.scan_loop(&device, &previews).await;

        match &outcome {
            ScanOutcome::Found(payload) => tracing::info!(device = %device, payload = %payload, "tag found"),
            ScanOutcome::Cancelled => tracing::info!(device = %device, "scan cancelled"),
            ScanOutcome::DeviceUnavailable(e) => tracing::error!(device = %device, error = %e, "scan aborted"),
        }

        self.shutdown_source(&device).await;
        outcome
    }

    async fn scan_loop(&mut self, device: &str, previews: &mpsc::Sender<PreviewFrame>) -> ScanOutcome {
        let mut sequence: u64 = 0;
        let mut failures: u32 = 0;
        let mut failing_since: Option<Instant> = None;

        loop {
            if previews.is_closed() {
                return ScanOutcome::Cancelled;
            }

            // ACQUIRE
            let captured = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ScanOutcome::Cancelled,
                captured = self.source.capture_frame() => captured,
            };

            let frame = match captured {
                Ok(frame) => {
                    failures = 0;
                    failing_since = None;
                    frame
                }
                Err(e) => {
                    failures += 1;
                    let since = *failing_since.get_or_insert_with(Instant::now);
                    tracing::warn!(device = %device, failures, error = %e, "frame read failed");

                    if !e.is_retryable()
                        || failures >= self.limits.max_consecutive_failures
                        || since.elapsed() >= self.limits.failure_timeout
                    {
                        return ScanOutcome::DeviceUnavailable(
                            TagError::device_unavailable(device, failures, e.to_string())
                                .with_operation("read frame"),
                        );
                    }

                    let delay = Duration::from_millis(e.retry_delay_ms().unwrap_or(0))
                        .min(self.limits.frame_interval);
                    if !pause(&self.cancel, delay).await {
                        return ScanOutcome::Cancelled;
                    }
                    continue;
                }
            };

            // DECODE
            if let Some(payload) = self.decoder.decode(&frame) {
                return ScanOutcome::Found(payload);
            }

            // EMIT
            match self.preview.encode(&frame, sequence) {
                Ok(preview) => {
                    let sent = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return ScanOutcome::Cancelled,
                        sent = previews.send(preview) => sent,
                    };
                    if sent.is_err() {
                        return ScanOutcome::Cancelled;
                    }
                }
                Err(e) => tracing::warn!(sequence, error = %e, "preview skipped"),
            }
            sequence += 1;

            if !pause(&self.cancel, self.limits.frame_interval).await {
                return ScanOutcome::Cancelled;
            }
        }
    }

    async fn shutdown_source(&mut self, device: &str) {
        if let Err(e) = self.source.shutdown().await {
            tracing::warn!(device = %device, error = %e, "capture device shutdown failed");
        }
    }
}

/// Sleep unless cancelled first. Returns false on cancellation.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Builder for creating scan sessions with fluent API.
pub struct ScanSessionBuilder {
    source: Option<Box<dyn CaptureSource>>,
    decoder: Option<Box<dyn FrameDecoder>>,
    preview: Option<PreviewEncoder>,
    limits: ScanLimits,
    cancel: Option<CancellationToken>,
}

impl Default for ScanSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSessionBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            decoder: None,
            preview: None,
            limits: ScanLimits::default(),
            cancel: None,
        }
    }

    /// Set the capture source for the session.
    pub fn with_capture_source<S: CaptureSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set an already boxed capture source.
    pub fn with_boxed_source(mut self, source: Box<dyn CaptureSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the default QR decoder.
    pub fn with_decoder<D: FrameDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn with_preview(mut self, preview: PreviewEncoder) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> TagResult<ScanSession> {
        let source = self.source.ok_or_else(|| {
            TagError::state("unconfigured", "build scan session", "no capture source specified")
        })?;

        if self.limits.max_consecutive_failures == 0 {
            return Err(TagError::config(
                "max_consecutive_failures",
                "0",
                "must allow at least one failed read",
            ));
        }

        Ok(ScanSession {
            source,
            decoder: self.decoder.unwrap_or_else(|| Box::new(QrDecoder::new())),
            preview: self.preview.unwrap_or_default(),
            limits: self.limits,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverOpens;

    #[async_trait]
    impl CaptureSource for NeverOpens {
        async fn initialize(&mut self) -> TagResult<()> {
            Err(TagError::frame_capture("no such device"))
        }
        async fn capture_frame(&mut self) -> TagResult<RgbFrame> {
            unreachable!("never initialized")
        }
        fn input_size(&self) -> Size {
            Size { w: 0, h: 0 }
        }
        fn describe(&self) -> String {
            "test:none".to_string()
        }
        async fn shutdown(&mut self) -> TagResult<()> {
            Ok(())
        }
    }

    #[test]
    fn build_requires_source() {
        assert!(ScanSession::builder().build().is_err());
    }

    #[test]
    fn build_rejects_zero_failure_bound() {
        let limits = ScanLimits {
            max_consecutive_failures: 0,
            ..ScanLimits::default()
        };
        let result = ScanSession::builder()
            .with_capture_source(NeverOpens)
            .with_limits(limits)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn open_failure_reports_zero_attempts() {
        let session = ScanSession::builder()
            .with_capture_source(NeverOpens)
            .build()
            .unwrap();
        let (tx, _rx) = mpsc::channel(1);

        match session.run(tx).await {
            ScanOutcome::DeviceUnavailable(TagError::DeviceUnavailable { device, attempts, .. }) => {
                assert_eq!(device, "test:none");
                assert_eq!(attempts, 0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
