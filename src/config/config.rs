//! # Service Configuration
//!
//! Every tunable of the tagging service, with defaults that match a single
//! shop counter: one USB camera, the web UI on localhost.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `server.bind` | `127.0.0.1:5000` | HTTP listen address |
//! | `server.static_dir` | `static` | Where tag images are written and served from |
//! | `server.tag_side` | `256` | Smallest side of a rendered tag, in pixels |
//! | `scan.camera` | `camera:0` | `camera:<n>`, `http(s)://` snapshot URL or `frames:<dir>` |
//! | `scan.max_consecutive_failures` | `300` | Failed reads before giving up on the device |
//! | `scan.failure_timeout_secs` | `10` | Longest run of failed reads, in seconds |
//! | `scan.frame_interval_ms` | `33` | Pause between frames |
//! | `scan.preview_max_side` | `640` | Longest preview side, `0` for native |
//! | `scan.jpeg_quality` | `80` | Preview JPEG quality, 1-100 |
//! | `scan.preview_capacity` | `4` | Previews buffered ahead of a slow viewer |
//! | `scan.request_timeout_ms` | `2000` | Snapshot camera request timeout |
//! | `scan.loop_frames` | `false` | Replay `frames:` directories forever |
//! | `scan.result_wait_ms` | `1500` | How long `/scan_result` waits before answering "pending" |
//! | `log_level` | `info` | Default tracing level when `RUST_LOG` is unset |
//!
//! ## Example
//!
//! ```toml
//! log_level = "debug"
//!
//! [server]
//! bind = "0.0.0.0:5000"
//!
//! [scan]
//! camera = "http://192.168.0.20:8080/shot.jpg"
//! preview_max_side = 480
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tag_scale::presets::ScaleTarget;

use crate::capture::{CaptureTarget, SourceOptions};
use crate::error::{TagError, TagResult};
use crate::generator::DEFAULT_TAG_SIDE;
use crate::session::ScanLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scan: ScanConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scan: ScanConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: PathBuf,
    pub tag_side: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            static_dir: PathBuf::from("static"),
            tag_side: DEFAULT_TAG_SIDE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub camera: String,
    pub max_consecutive_failures: u32,
    pub failure_timeout_secs: u64,
    pub frame_interval_ms: u64,
    pub preview_max_side: u32,
    pub jpeg_quality: u8,
    pub preview_capacity: usize,
    pub request_timeout_ms: u64,
    pub loop_frames: bool,
    pub result_wait_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            camera: "camera:0".to_string(),
            max_consecutive_failures: 300,
            failure_timeout_secs: 10,
            frame_interval_ms: 33,
            preview_max_side: 640,
            jpeg_quality: 80,
            preview_capacity: 4,
            request_timeout_ms: 2000,
            loop_frames: false,
            result_wait_ms: 1500,
        }
    }
}

impl AppConfig {
    /// Check every field that can be wrong independently of the environment.
    pub fn validate(&self) -> TagResult<()> {
        self.bind_addr()?;
        self.capture_target()?;

        if self.server.static_dir.as_os_str().is_empty() {
            return Err(TagError::config("server.static_dir", "", "must not be empty"));
        }
        if !(64..=4096).contains(&self.server.tag_side) {
            return Err(TagError::config(
                "server.tag_side",
                self.server.tag_side.to_string(),
                "must be between 64 and 4096",
            ));
        }
        let scan = &self.scan;
        if scan.max_consecutive_failures == 0 {
            return Err(TagError::config(
                "scan.max_consecutive_failures",
                "0",
                "must be greater than 0",
            ));
        }
        if scan.failure_timeout_secs == 0 {
            return Err(TagError::config("scan.failure_timeout_secs", "0", "must be greater than 0"));
        }
        if !(1..=100).contains(&scan.jpeg_quality) {
            return Err(TagError::config(
                "scan.jpeg_quality",
                scan.jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        if scan.preview_capacity == 0 {
            return Err(TagError::config("scan.preview_capacity", "0", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> TagResult<SocketAddr> {
        self.server.bind.parse().map_err(|e: std::net::AddrParseError| {
            TagError::config("server.bind", &self.server.bind, e.to_string())
        })
    }

    pub fn capture_target(&self) -> TagResult<CaptureTarget> {
        self.scan.camera.parse()
    }

    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            max_consecutive_failures: self.scan.max_consecutive_failures,
            failure_timeout: Duration::from_secs(self.scan.failure_timeout_secs),
            frame_interval: Duration::from_millis(self.scan.frame_interval_ms),
        }
    }

    /// Preview scale target, `None` when previews stay at capture size.
    pub fn preview_target(&self) -> Option<ScaleTarget> {
        match self.scan.preview_max_side {
            0 => None,
            side => Some(ScaleTarget::MaxLongSide(side)),
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            request_timeout: Duration::from_millis(self.scan.request_timeout_ms),
            loop_frames: self.scan.loop_frames,
        }
    }

    pub fn result_wait(&self) -> Duration {
        Duration::from_millis(self.scan.result_wait_ms)
    }
}
