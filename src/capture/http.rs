//! Snapshot capture from network cameras.
//!
//! Many IP cameras and phone camera apps expose the current picture as a
//! JPEG at a fixed URL. Each `capture_frame` fetches and decodes one snapshot.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{RgbFrame, Size};
use crate::error::{TagError, TagResult};
use crate::session::CaptureSource;

#[derive(Debug)]
pub struct HttpSnapshotSource {
    url: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
    size: Size,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: None,
            size: Size { w: 0, h: 0 },
        }
    }

    async fn fetch(&self, client: &reqwest::Client) -> TagResult<RgbFrame> {
        let response = client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TagError::frame_capture(format!("snapshot request failed: {}", e)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TagError::frame_capture(format!("snapshot body unreadable: {}", e)))?;

        let image = image::load_from_memory(&body)
            .map_err(|e| TagError::frame_capture(format!("snapshot is not an image: {}", e)))?;
        Ok(RgbFrame::from(image.to_rgb8()))
    }
}

#[async_trait]
impl CaptureSource for HttpSnapshotSource {
    async fn initialize(&mut self) -> TagResult<()> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TagError::external("reqwest", e))?;

        // One probe so an unreachable camera fails at open time.
        let probe = self.fetch(&client).await?;
        self.size = probe.size();
        self.client = Some(client);
        Ok(())
    }

    async fn capture_frame(&mut self) -> TagResult<RgbFrame> {
        let client = self.client.clone().ok_or_else(|| {
            TagError::state("closed", "capture_frame", "snapshot source not initialized")
        })?;
        self.fetch(&client).await
    }

    fn input_size(&self) -> Size {
        self.size
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn shutdown(&mut self) -> TagResult<()> {
        self.client = None;
        Ok(())
    }
}
