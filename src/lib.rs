//! # Stock Tag Library
//!
//! Clothing inventory tagging: register a garment's attributes, render them
//! into a QR tag image, and read tags back from a live camera feed.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `validation`, `filename`: pure checks and tag file naming
//! - `inventory`: process-lifetime list of registered garments
//! - `generator`: form validation, QR rendering, atomic write + record
//! - `capture`: camera, HTTP snapshot and image-sequence frame sources
//! - `processing`: QR decoding and JPEG preview encoding per frame
//! - `session`: the scan loop and its builder
//! - `web`: axum routes, pages and shared state
//! - `config`, `telemetry`, `error`: ambient plumbing
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stock_tag::generator::{CodeGenerator, TagRequest};
//! use stock_tag::inventory::Inventory;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inventory = Arc::new(Inventory::new());
//! let generator = CodeGenerator::new("static", inventory.clone())?;
//!
//! let tag = generator.generate(&TagRequest {
//!     product: "Camisa".into(),
//!     size: "m".into(),
//!     color: "Azul".into(),
//!     fabric: "Algodao".into(),
//!     price: "29.9".into(),
//! })?;
//! assert_eq!(tag.record.image_file_name, "camisa_m_azul_algodao.png");
//! # Ok(())
//! # }
//! ```

// Standard library imports
use std::time::Duration;

// Internal module imports
pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod filename;
pub mod generator;
pub mod inventory;
pub mod processing;
pub mod session;
pub mod telemetry;
pub mod validation;
pub mod web;

/// Re-export error types for convenience
pub use error::{HasRecoverySuggestion, HasSeverity, Retryable, TagError, TagResult};

use config::AppConfig;
use processing::{PreviewEncoder, PreviewFrame};
use session::{ScanHandle, ScanOutcome, ScanSession};

/// Run one scan with the configured source, outside the web interface.
///
/// Every preview is handed to `on_preview`. With a `timeout` the scan is
/// cancelled once it elapses and a timeout error is returned.
pub async fn scan_once<F>(
    config: &AppConfig,
    timeout: Option<Duration>,
    mut on_preview: F,
) -> TagResult<ScanOutcome>
where
    F: FnMut(&PreviewFrame),
{
    let target = config.capture_target()?;
    let source = capture::open_source(&target, config.source_options())?;
    let session = ScanSession::builder()
        .with_boxed_source(source)
        .with_preview(PreviewEncoder::new(
            config.preview_target(),
            config.scan.jpeg_quality,
        ))
        .with_limits(config.scan_limits())
        .build()?;

    tracing::info!(source = %target, "scanning");
    let ScanHandle {
        mut previews,
        completion,
        cancel,
        task,
    } = session.spawn(config.scan.preview_capacity);

    let drain = async {
        while let Some(preview) = previews.recv().await {
            on_preview(&preview);
        }
        completion.await
    };

    let completion = match timeout {
        Some(limit) => match tokio::time::timeout(limit, drain).await {
            Ok(completion) => completion,
            Err(_) => {
                cancel.cancel();
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "scan task did not stop cleanly");
                }
                return Err(TagError::timeout("scan", millis(limit))
                    .with_recovery_suggestion("Nenhum QR code encontrado no tempo limite."));
            }
        },
        None => drain.await,
    };

    completion.map_err(|_| TagError::state("running", "await scan", "scan task ended without an outcome"))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
