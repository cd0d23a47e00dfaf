//! # Capture Module
//!
//! Frame sources for the scan loop and the parser that picks one from a
//! configuration string.
//!
//! | Target              | Source                 |
//! |---------------------|------------------------|
//! | `camera:<index>`    | [`camera::CameraSource`] (feature `camera`) |
//! | `http(s)://...`     | [`http::HttpSnapshotSource`] |
//! | `frames:<dir>`      | [`sequence::ImageSequenceSource`] |

pub mod http;
pub mod sequence;
#[cfg(feature = "camera")]
pub mod camera;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{TagError, TagResult};
use crate::session::CaptureSource;

/// Where scan frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    /// Local camera by index.
    Camera(u32),
    /// IP camera exposing a still-image snapshot URL.
    Snapshot(String),
    /// Directory of still images replayed in name order.
    Frames(PathBuf),
}

impl Default for CaptureTarget {
    fn default() -> Self {
        CaptureTarget::Camera(0)
    }
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTarget::Camera(index) => write!(f, "camera:{}", index),
            CaptureTarget::Snapshot(url) => f.write_str(url),
            CaptureTarget::Frames(dir) => write!(f, "frames:{}", dir.display()),
        }
    }
}

impl FromStr for CaptureTarget {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(CaptureTarget::Snapshot(s.to_string()));
        }
        if let Some(dir) = s.strip_prefix("frames:") {
            if dir.is_empty() {
                return Err(TagError::config("camera", s, "frames: needs a directory"));
            }
            return Ok(CaptureTarget::Frames(PathBuf::from(dir)));
        }
        let index = s.strip_prefix("camera:").unwrap_or(s);
        index.parse::<u32>().map(CaptureTarget::Camera).map_err(|_| {
            TagError::config(
                "camera",
                s,
                "expected camera:<index>, an http(s) snapshot URL or frames:<dir>",
            )
        })
    }
}

/// Source construction options shared by every backend.
#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    /// Per-request timeout for snapshot cameras.
    pub request_timeout: Duration,
    /// Replay a frame directory forever instead of failing once it is exhausted.
    pub loop_frames: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
            loop_frames: false,
        }
    }
}

/// Build the capture source for `target`. The device is not opened yet.
pub fn open_source(
    target: &CaptureTarget,
    options: SourceOptions,
) -> TagResult<Box<dyn CaptureSource>> {
    match target {
        CaptureTarget::Snapshot(url) => Ok(Box::new(http::HttpSnapshotSource::new(
            url.clone(),
            options.request_timeout,
        ))),
        CaptureTarget::Frames(dir) => Ok(Box::new(
            sequence::ImageSequenceSource::new(dir.clone()).looping(options.loop_frames),
        )),
        #[cfg(feature = "camera")]
        CaptureTarget::Camera(index) => Ok(Box::new(camera::CameraSource::new(*index))),
        #[cfg(not(feature = "camera"))]
        CaptureTarget::Camera(index) => Err(TagError::device_unavailable(
            format!("camera:{}", index),
            0,
            "built without native camera support",
        )
        .with_recovery_suggestion(
            "Rebuild with --features camera or set camera to an http(s) snapshot URL.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targets() {
        assert_eq!("0".parse::<CaptureTarget>().unwrap(), CaptureTarget::Camera(0));
        assert_eq!("camera:2".parse::<CaptureTarget>().unwrap(), CaptureTarget::Camera(2));
        assert_eq!(
            "http://10.0.0.5:8080/shot.jpg".parse::<CaptureTarget>().unwrap(),
            CaptureTarget::Snapshot("http://10.0.0.5:8080/shot.jpg".to_string())
        );
        assert_eq!(
            "frames:/tmp/scan".parse::<CaptureTarget>().unwrap(),
            CaptureTarget::Frames(PathBuf::from("/tmp/scan"))
        );
        assert!("webcam".parse::<CaptureTarget>().is_err());
        assert!("frames:".parse::<CaptureTarget>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for target in [
            CaptureTarget::Camera(1),
            CaptureTarget::Snapshot("https://cam.local/snap".to_string()),
            CaptureTarget::Frames(PathBuf::from("fixtures")),
        ] {
            assert_eq!(target.to_string().parse::<CaptureTarget>().unwrap(), target);
        }
    }
}
