//! Native camera capture through `nokhwa`.
//!
//! `nokhwa::Camera` is not `Send`, so the device lives on a dedicated thread
//! for its whole life. The async side talks to it over a request channel and
//! gets each frame back through a oneshot.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use tokio::sync::oneshot;

use crate::core::{RgbFrame, Size};
use crate::error::{TagError, TagResult};
use crate::session::CaptureSource;

enum Request {
    Frame(oneshot::Sender<TagResult<RgbFrame>>),
    Stop,
}

pub struct CameraSource {
    index: u32,
    size: Size,
    requests: Option<std_mpsc::Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl CameraSource {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            size: Size { w: 0, h: 0 },
            requests: None,
            worker: None,
        }
    }

    fn open(index: u32) -> TagResult<Camera> {
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .map_err(|e| TagError::external("nokhwa", e))?;
        camera
            .open_stream()
            .map_err(|e| TagError::external("nokhwa", e))?;
        Ok(camera)
    }

    fn grab(camera: &mut Camera) -> TagResult<RgbFrame> {
        let buffer = camera
            .frame()
            .map_err(|e| TagError::frame_capture(format!("camera read failed: {}", e)))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| TagError::frame_capture(format!("camera frame undecodable: {}", e)))?;
        let (width, height) = (decoded.width(), decoded.height());
        RgbFrame::new(decoded.into_raw(), width, height)
    }

    fn worker_loop(index: u32, ready: oneshot::Sender<TagResult<Size>>, requests: std_mpsc::Receiver<Request>) {
        let mut camera = match Self::open(index) {
            Ok(camera) => camera,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let resolution = camera.resolution();
        let _ = ready.send(Ok(Size {
            w: resolution.width(),
            h: resolution.height(),
        }));

        while let Ok(Request::Frame(reply)) = requests.recv() {
            let _ = reply.send(Self::grab(&mut camera));
        }

        if let Err(e) = camera.stop_stream() {
            tracing::warn!(index, error = %e, "camera stream did not stop cleanly");
        }
    }
}

#[async_trait]
impl CaptureSource for CameraSource {
    async fn initialize(&mut self) -> TagResult<()> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (req_tx, req_rx) = std_mpsc::channel();
        let index = self.index;

        let worker = std::thread::Builder::new()
            .name(format!("camera-{}", index))
            .spawn(move || Self::worker_loop(index, ready_tx, req_rx))
            .map_err(|e| TagError::io("spawn camera thread", e))?;
        self.worker = Some(worker);

        self.size = ready_rx
            .await
            .map_err(|_| TagError::frame_capture("camera thread exited during open"))??;
        self.requests = Some(req_tx);

        tracing::info!(index, width = self.size.w, height = self.size.h, "camera opened");
        Ok(())
    }

    async fn capture_frame(&mut self) -> TagResult<RgbFrame> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| TagError::state("closed", "capture_frame", "camera not open"))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        requests
            .send(Request::Frame(reply_tx))
            .map_err(|_| TagError::frame_capture("camera thread stopped"))?;
        reply_rx
            .await
            .map_err(|_| TagError::frame_capture("camera thread dropped the request"))?
    }

    fn input_size(&self) -> Size {
        self.size
    }

    fn describe(&self) -> String {
        format!("camera:{}", self.index)
    }

    async fn shutdown(&mut self) -> TagResult<()> {
        if let Some(requests) = self.requests.take() {
            let _ = requests.send(Request::Stop);
        }
        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| TagError::state("stopping", "join camera thread", e.to_string()))?
                .map_err(|_| TagError::state("stopping", "join camera thread", "camera thread panicked"))?;
        }
        Ok(())
    }
}
