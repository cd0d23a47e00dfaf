//! Request handlers.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/` | GET | Landing page, drains pending flashes |
//! | `/ler_qr` | GET | Scan page (live feed + result polling) |
//! | `/processar_qr_camera` | POST | Start a scan, then go to the scan page |
//! | `/video_feed` | GET | `multipart/x-mixed-replace` JPEG preview stream |
//! | `/scan_result` | GET | Wait briefly for the scan outcome |
//! | `/cancelar_qr` | POST | Stop the running scan |
//! | `/gerar_qr` | GET, POST | Registration form and tag generation |
//! | `/estoque` | GET | Inventory snapshot as JSON |
//! | `/health` | GET | Liveness |

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Form, Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{ErrorSeverity, HasSeverity, TagError};
use crate::generator::TagRequest;
use crate::processing::PreviewFrame;
use crate::session::ScanOutcome;
use crate::web::pages;
use crate::web::state::{AppState, Flash, ScanPoll};

pub const MJPEG_BOUNDARY: &str = "frame";
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

pub const GENERATED_MESSAGE: &str = "QR Code gerado com sucesso!";

type SharedState = State<Arc<AppState>>;

/// One part of the preview stream: boundary, headers, raw JPEG.
pub fn multipart_part(preview: &PreviewFrame) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        MJPEG_BOUNDARY,
        preview.jpeg.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + preview.jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(&preview.jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

pub fn status_for(error: &TagError) -> StatusCode {
    match error {
        TagError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TagError::State { .. } => StatusCode::CONFLICT,
        TagError::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TagError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn camera_message(error: &TagError) -> String {
    format!("Erro ao acessar a câmera: {}", error.user_message())
}

/// Flash announcing how a scan ended. Cancelled scans are silent.
fn outcome_flash(outcome: ScanOutcome) -> Option<Flash> {
    match outcome {
        ScanOutcome::Found(payload) => Some(Flash::success(format!("Informações do QR code: {}", payload))),
        ScanOutcome::DeviceUnavailable(e) => Some(Flash::error(camera_message(&e))),
        ScanOutcome::Cancelled => None,
    }
}

pub async fn index(State(state): SharedState) -> Response {
    // The scan page may leave before its poll collects the result.
    if let Some(flash) = state.collect_finished().await.and_then(outcome_flash) {
        state.push_flash(flash);
    }
    let flashes = state.take_flashes();
    match state.inventory.len() {
        Ok(count) => Html(pages::index(&flashes, count)).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

pub async fn scan_page() -> Html<String> {
    Html(pages::scan_page())
}

pub async fn start_scan(State(state): SharedState) -> Response {
    match state.start_scan().await {
        Ok(()) => Redirect::to("/ler_qr").into_response(),
        Err(e @ TagError::State { .. }) => (StatusCode::CONFLICT, e.user_message()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "scan could not start");
            state.push_flash(Flash::error(camera_message(&e)));
            Redirect::to("/").into_response()
        }
    }
}

pub async fn video_feed(State(state): SharedState) -> Response {
    let previews = match state.claim_previews().await {
        Ok(previews) => previews,
        Err(e) => {
            tracing::warn!(error = %e, "preview stream refused");
            if !matches!(e, TagError::State { .. }) {
                state.push_flash(Flash::error(camera_message(&e)));
            }
            return (status_for(&e), e.user_message()).into_response();
        }
    };

    let stream =
        ReceiverStream::new(previews).map(|preview| Ok::<_, Infallible>(multipart_part(&preview)));

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

pub async fn scan_result(State(state): SharedState) -> Response {
    match state.poll_scan(state.config.result_wait()).await {
        ScanPoll::Idle => StatusCode::NOT_FOUND.into_response(),
        ScanPoll::Pending => StatusCode::NO_CONTENT.into_response(),
        ScanPoll::Finished(outcome) => {
            if let Some(flash) = outcome_flash(outcome) {
                state.push_flash(flash);
            }
            Redirect::to("/").into_response()
        }
    }
}

pub async fn cancel_scan(State(state): SharedState) -> Redirect {
    if state.cancel_scan().await {
        tracing::info!("scan cancelled from web");
    }
    Redirect::to("/")
}

pub async fn generate_form() -> Html<String> {
    Html(pages::generate_page(&TagRequest::default(), &[], None))
}

pub async fn generate_tag(State(state): SharedState, Form(form): Form<TagRequest>) -> Response {
    let generator = state.generator.clone();
    let request = form.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&request)).await;

    match result {
        Ok(Ok(tag)) => Html(pages::generate_page(
            &form,
            &[Flash::success(GENERATED_MESSAGE)],
            Some(&tag.record.image_file_name),
        ))
        .into_response(),
        Ok(Err(e)) => {
            if e.severity() >= ErrorSeverity::Error {
                tracing::error!(error = %e, category = e.category(), "tag generation failed");
            } else {
                tracing::warn!(error = %e, category = e.category(), "tag generation rejected");
            }
            (
                status_for(&e),
                Html(pages::generate_page(&form, &[Flash::error(e.user_message())], None)),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "tag generation task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::generate_page(
                    &form,
                    &[Flash::error("Erro ao gerar QR Code: falha interna.")],
                    None,
                )),
            )
                .into_response()
        }
    }
}

pub async fn inventory(State(state): SharedState) -> Response {
    match state.inventory.snapshot() {
        Ok(records) => Json(records).into_response(),
        Err(e) => (status_for(&e), e.to_string()).into_response(),
    }
}

pub async fn health(State(state): SharedState) -> Response {
    let scanning = state.scan_running().await;
    match state.inventory.len() {
        Ok(count) => Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "inventory": count,
            "scanning": scanning,
        }))
        .into_response(),
        Err(e) => (
            status_for(&e),
            Json(serde_json::json!({
                "status": "error",
                "version": env!("CARGO_PKG_VERSION"),
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}
