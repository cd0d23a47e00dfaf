//! Scan loop behavior against scripted capture sources.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::mock_capture::{ScriptedSource, Step, Then};
use common::test_frames;
use stock_tag::capture::sequence::ImageSequenceSource;
use stock_tag::error::TagError;
use stock_tag::generator::{CodeGenerator, TagRequest};
use stock_tag::inventory::Inventory;
use stock_tag::processing::PreviewEncoder;
use stock_tag::session::{ScanLimits, ScanOutcome, ScanSession};
use tag_scale::presets::ScaleTarget;
use tokio_util::sync::CancellationToken;

fn fast_limits(max_failures: u32) -> ScanLimits {
    ScanLimits {
        max_consecutive_failures: max_failures,
        failure_timeout: Duration::from_secs(30),
        frame_interval: Duration::ZERO,
    }
}

async fn outcome_of(completion: tokio::sync::oneshot::Receiver<ScanOutcome>) -> ScanOutcome {
    tokio::time::timeout(Duration::from_secs(10), completion)
        .await
        .expect("scan finished in time")
        .expect("scan reported an outcome")
}

#[tokio::test]
async fn test_previews_precede_found() {
    let mut script: Vec<Step> = (0..4).map(|i| Step::Frame(test_frames::blank(40 * i))).collect();
    script.push(Step::Frame(test_frames::qr("Produto: Camisa, Tamanho: M")));
    let (source, probe) = ScriptedSource::new(script, Then::FailForever);

    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(fast_limits(3))
        .build()
        .unwrap();
    let mut handle = session.spawn(16);

    let outcome = outcome_of(handle.completion).await;
    assert!(matches!(outcome, ScanOutcome::Found(ref p) if p == "Produto: Camisa, Tamanho: M"));

    let mut sequences = Vec::new();
    while let Some(preview) = handle.previews.recv().await {
        assert_eq!(&preview.jpeg[..2], &[0xFF, 0xD8]);
        sequences.push(preview.sequence);
    }
    assert_eq!(sequences, [0, 1, 2, 3]);
    assert_eq!(probe.reads(), 5);
    assert!(probe.was_shut_down());
}

#[tokio::test]
async fn test_first_frame_found_sends_no_preview() {
    let (source, _probe) = ScriptedSource::new(
        vec![Step::Frame(test_frames::qr("Produto: Saia"))],
        Then::FailForever,
    );
    let session = ScanSession::builder()
        .with_capture_source(source)
        .build()
        .unwrap();
    let mut handle = session.spawn(4);

    assert!(outcome_of(handle.completion).await.is_found());
    assert!(handle.previews.recv().await.is_none());
}

#[tokio::test]
async fn test_failures_past_bound_report_device_unavailable() {
    let (source, probe) = ScriptedSource::new(Vec::new(), Then::FailForever);
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(fast_limits(5))
        .build()
        .unwrap();
    let handle = session.spawn(4);

    match outcome_of(handle.completion).await {
        ScanOutcome::DeviceUnavailable(TagError::DeviceUnavailable { device, attempts, .. }) => {
            assert_eq!(device, "mock:scripted");
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(probe.reads(), 5);
    assert!(probe.was_shut_down());
}

#[tokio::test]
async fn test_non_retryable_failure_ends_scan_at_once() {
    let (source, probe) = ScriptedSource::new(
        vec![Step::Frame(test_frames::blank(10)), Step::Broken],
        Then::Repeat(test_frames::blank(20)),
    );
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(fast_limits(300))
        .build()
        .unwrap();
    let handle = session.spawn(4);

    match outcome_of(handle.completion).await {
        ScanOutcome::DeviceUnavailable(TagError::DeviceUnavailable { attempts, reason, .. }) => {
            assert_eq!(attempts, 1);
            assert!(reason.contains("device handle lost"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(probe.reads(), 2);
    assert!(probe.was_shut_down());
}

#[tokio::test]
async fn test_outcome_ready_when_previews_close() {
    let (source, _probe) = ScriptedSource::new(
        vec![Step::Frame(test_frames::qr("Produto: Vestido"))],
        Then::FailForever,
    );
    let session = ScanSession::builder()
        .with_capture_source(source)
        .build()
        .unwrap();
    let mut handle = session.spawn(4);

    assert!(handle.previews.recv().await.is_none());
    match handle.completion.try_recv() {
        Ok(ScanOutcome::Found(payload)) => assert_eq!(payload, "Produto: Vestido"),
        other => panic!("outcome not ready after previews closed: {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_window_reports_device_unavailable() {
    let (source, _probe) = ScriptedSource::new(Vec::new(), Then::FailForever);
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(ScanLimits {
            max_consecutive_failures: u32::MAX,
            failure_timeout: Duration::from_millis(50),
            frame_interval: Duration::from_millis(5),
        })
        .build()
        .unwrap();
    let handle = session.spawn(4);

    assert!(matches!(
        outcome_of(handle.completion).await,
        ScanOutcome::DeviceUnavailable(_)
    ));
}

#[tokio::test]
async fn test_successful_read_resets_failure_count() {
    let script = vec![
        Step::Fail,
        Step::Fail,
        Step::Frame(test_frames::blank(0)),
        Step::Fail,
        Step::Fail,
        Step::Frame(test_frames::qr("Produto: Calca")),
    ];
    let (source, _probe) = ScriptedSource::new(script, Then::FailForever);
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(fast_limits(3))
        .build()
        .unwrap();
    let handle = session.spawn(4);

    assert!(matches!(
        outcome_of(handle.completion).await,
        ScanOutcome::Found(ref p) if p == "Produto: Calca"
    ));
}

#[tokio::test]
async fn test_dropped_viewer_cancels_and_releases_source() {
    let (source, probe) = ScriptedSource::new(Vec::new(), Then::Repeat(test_frames::blank(128)));
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(fast_limits(3))
        .build()
        .unwrap();
    let mut handle = session.spawn(1);

    assert!(handle.previews.recv().await.is_some());
    drop(handle.previews);

    assert!(matches!(outcome_of(handle.completion).await, ScanOutcome::Cancelled));
    assert!(probe.was_shut_down());
}

#[tokio::test]
async fn test_cancel_token_stops_scan() {
    let (source, probe) = ScriptedSource::new(Vec::new(), Then::Repeat(test_frames::blank(10)));
    let cancel = CancellationToken::new();
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_limits(ScanLimits {
            frame_interval: Duration::from_millis(10),
            ..ScanLimits::default()
        })
        .with_cancel_token(cancel.clone())
        .build()
        .unwrap();
    let mut handle = session.spawn(64);

    assert!(handle.previews.recv().await.is_some());
    cancel.cancel();

    assert!(matches!(outcome_of(handle.completion).await, ScanOutcome::Cancelled));
    assert!(probe.was_shut_down());
}

#[tokio::test]
async fn test_preview_is_scaled_to_target() {
    let (source, _probe) = ScriptedSource::new(
        vec![Step::Frame(test_frames::blank(200))],
        Then::Repeat(test_frames::qr("Produto: Blusa")),
    );
    let session = ScanSession::builder()
        .with_capture_source(source)
        .with_preview(PreviewEncoder::new(Some(ScaleTarget::MaxLongSide(80)), 75))
        .with_limits(fast_limits(3))
        .build()
        .unwrap();
    let mut handle = session.spawn(4);

    let preview = handle.previews.recv().await.expect("one preview");
    assert_eq!((preview.width, preview.height), (80, 60));
    assert!(outcome_of(handle.completion).await.is_found());
}

#[tokio::test]
async fn test_generated_tag_scans_back_to_its_payload() {
    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(dir.path(), Arc::new(Inventory::new())).unwrap();
    let tag = generator
        .generate(&TagRequest {
            product: "Camiseta".to_string(),
            size: "gg".to_string(),
            color: "Preta".to_string(),
            fabric: "Linho".to_string(),
            price: "59.9".to_string(),
        })
        .unwrap();

    let session = ScanSession::builder()
        .with_capture_source(ImageSequenceSource::new(dir.path()))
        .with_limits(fast_limits(3))
        .build()
        .unwrap();
    let handle = session.spawn(4);

    match outcome_of(handle.completion).await {
        ScanOutcome::Found(payload) => assert_eq!(payload, tag.payload),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
