//! Shared state behind every handler.
//!
//! One [`AppState`] is built at startup and shared by `Arc`. It owns the
//! inventory, the tag generator, the queue of flash messages shown on the
//! landing page, and the slot for the single scan allowed to run at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::open_source;
use crate::config::AppConfig;
use crate::error::{TagError, TagResult};
use crate::generator::CodeGenerator;
use crate::inventory::Inventory;
use crate::processing::{PreviewEncoder, PreviewFrame};
use crate::session::{ScanOutcome, ScanSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

/// One-shot message shown on the next landing page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// The scan currently owned by the web layer.
struct ActiveScan {
    id: u64,
    cancel: CancellationToken,
    /// Taken by the first viewer of `/video_feed`.
    previews: Option<mpsc::Receiver<PreviewFrame>>,
    /// Taken while `/scan_result` waits on it.
    completion: Option<oneshot::Receiver<ScanOutcome>>,
    task: JoinHandle<()>,
}

/// What `/scan_result` found.
#[derive(Debug)]
pub enum ScanPoll {
    /// No scan was started, or its result was already collected.
    Idle,
    /// Still scanning.
    Pending,
    Finished(ScanOutcome),
}

pub struct AppState {
    pub config: AppConfig,
    pub inventory: Arc<Inventory>,
    pub generator: CodeGenerator,
    flashes: Mutex<Vec<Flash>>,
    scan: tokio::sync::Mutex<Option<ActiveScan>>,
    next_scan_id: AtomicU64,
}

impl AppState {
    /// Build the state for `config`, creating the static directory.
    pub fn new(config: AppConfig) -> TagResult<Self> {
        let inventory = Arc::new(Inventory::new());
        let generator = CodeGenerator::new(config.server.static_dir.clone(), inventory.clone())?
            .with_tag_side(config.server.tag_side);

        Ok(Self {
            config,
            inventory,
            generator,
            flashes: Mutex::new(Vec::new()),
            scan: tokio::sync::Mutex::new(None),
            next_scan_id: AtomicU64::new(1),
        })
    }

    pub fn push_flash(&self, flash: Flash) {
        match self.flashes.lock() {
            Ok(mut flashes) => flashes.push(flash),
            Err(_) => tracing::error!(message = %flash.message, "flash queue poisoned, message dropped"),
        }
    }

    /// Remove and return every pending flash.
    pub fn take_flashes(&self) -> Vec<Flash> {
        self.flashes
            .lock()
            .map(|mut flashes| std::mem::take(&mut *flashes))
            .unwrap_or_default()
    }

    fn spawn_scan(&self) -> TagResult<ActiveScan> {
        let target = self.config.capture_target()?;
        let source = open_source(&target, self.config.source_options())?;
        let session = ScanSession::builder()
            .with_boxed_source(source)
            .with_preview(PreviewEncoder::new(
                self.config.preview_target(),
                self.config.scan.jpeg_quality,
            ))
            .with_limits(self.config.scan_limits())
            .build()?;

        let handle = session.spawn(self.config.scan.preview_capacity);
        let id = self.next_scan_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(scan = id, source = %target, "scan started from web");

        Ok(ActiveScan {
            id,
            cancel: handle.cancel,
            previews: Some(handle.previews),
            completion: Some(handle.completion),
            task: handle.task,
        })
    }

    /// Start a scan. Fails with a state error while another one is running.
    ///
    /// A finished scan whose result was never collected is discarded.
    pub async fn start_scan(&self) -> TagResult<()> {
        let mut slot = self.scan.lock().await;
        if slot.as_ref().is_some_and(|active| !active.task.is_finished()) {
            return Err(TagError::state("scanning", "start scan", "a scan is already running")
                .with_recovery_suggestion("Uma leitura já está em andamento."));
        }
        *slot = Some(self.spawn_scan()?);
        Ok(())
    }

    /// Preview stream for a viewer: the running scan's if nobody claimed it
    /// yet, otherwise a freshly started scan's.
    pub async fn claim_previews(&self) -> TagResult<mpsc::Receiver<PreviewFrame>> {
        let mut slot = self.scan.lock().await;

        if let Some(active) = slot.as_mut() {
            if !active.task.is_finished() {
                return active.previews.take().ok_or_else(|| {
                    TagError::state("scanning", "watch scan", "the running scan already has a viewer")
                        .with_recovery_suggestion("Uma leitura já está em andamento.")
                });
            }
        }

        let mut active = self.spawn_scan()?;
        let previews = active.previews.take().ok_or_else(|| {
            TagError::state("starting", "watch scan", "new scan has no preview stream")
        })?;
        *slot = Some(active);
        Ok(previews)
    }

    /// Wait up to `wait` for the running scan to finish.
    pub async fn poll_scan(&self, wait: std::time::Duration) -> ScanPoll {
        let (id, mut completion) = {
            let mut slot = self.scan.lock().await;
            match slot
                .as_mut()
                .and_then(|active| active.completion.take().map(|c| (active.id, c)))
            {
                Some(waiting) => waiting,
                None => return ScanPoll::Idle,
            }
        };

        let result = tokio::time::timeout(wait, &mut completion).await;

        let mut slot = self.scan.lock().await;
        let current = slot.as_ref().is_some_and(|active| active.id == id);
        match result {
            Ok(outcome) => {
                if current {
                    slot.take();
                }
                // A dropped sender means the task ended without reporting.
                ScanPoll::Finished(outcome.unwrap_or(ScanOutcome::Cancelled))
            }
            Err(_) => {
                if let Some(active) = slot.as_mut().filter(|_| current) {
                    active.completion = Some(completion);
                }
                ScanPoll::Pending
            }
        }
    }

    /// Take the outcome of a scan that has already finished, without waiting.
    ///
    /// Returns `None` while the scan runs or while `/scan_result` holds the
    /// completion.
    pub async fn collect_finished(&self) -> Option<ScanOutcome> {
        let mut slot = self.scan.lock().await;
        let outcome = match slot.as_mut()?.completion.as_mut()?.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => ScanOutcome::Cancelled,
        };
        slot.take();
        Some(outcome)
    }

    pub async fn scan_running(&self) -> bool {
        self.scan
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Cancel the running scan, if any.
    pub async fn cancel_scan(&self) -> bool {
        match self.scan.lock().await.as_ref() {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }
}
