//! Replays a directory of still images as a camera.
//!
//! Useful for demos and tests: drop photos of tags into a directory and point
//! the scanner at `frames:<dir>`. Images are read in file name order. Once the
//! sequence is exhausted every further read fails, which the scan loop treats
//! like a camera that stopped delivering frames.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::{RgbFrame, Size};
use crate::error::{TagError, TagResult};
use crate::session::CaptureSource;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    looping: bool,
    files: Vec<PathBuf>,
    next: usize,
    size: Size,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            looping: false,
            files: Vec::new(),
            next: 0,
            size: Size { w: 0, h: 0 },
        }
    }

    /// Start over from the first image after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    async fn load(path: PathBuf) -> TagResult<RgbFrame> {
        tokio::task::spawn_blocking(move || {
            image::open(&path)
                .map(|img| RgbFrame::from(img.to_rgb8()))
                .map_err(|e| {
                    TagError::frame_capture(format!("{}: {}", path.display(), e))
                })
        })
        .await
        .map_err(|e| TagError::frame_capture(format!("frame loader panicked: {}", e)))?
    }
}

#[async_trait]
impl CaptureSource for ImageSequenceSource {
    async fn initialize(&mut self) -> TagResult<()> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| TagError::io_at("list frame directory", &self.dir, e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();
        files.sort();

        let first = files.first().cloned().ok_or_else(|| {
            TagError::frame_capture(format!("no png or jpeg images in {}", self.dir.display()))
        })?;
        self.size = Self::load(first).await?.size();
        self.files = files;
        self.next = 0;

        tracing::debug!(dir = %self.dir.display(), frames = self.files.len(), "frame sequence opened");
        Ok(())
    }

    async fn capture_frame(&mut self) -> TagResult<RgbFrame> {
        if self.next >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Err(TagError::frame_capture("frame sequence exhausted"));
            }
            self.next = 0;
        }

        let path = self.files[self.next].clone();
        self.next += 1;
        Self::load(path).await
    }

    fn input_size(&self) -> Size {
        self.size
    }

    fn describe(&self) -> String {
        format!("frames:{}", self.dir.display())
    }

    async fn shutdown(&mut self) -> TagResult<()> {
        self.files.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            RgbImage::from_pixel(8, 6, Rgb([i as u8, 0, 0]))
                .save(dir.join(format!("frame_{i:02}.png")))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
    }

    #[tokio::test]
    async fn replays_in_name_order_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3);

        let mut source = ImageSequenceSource::new(dir.path());
        source.initialize().await.unwrap();
        assert_eq!(source.input_size(), Size { w: 8, h: 6 });

        for i in 0..3u8 {
            let frame = source.capture_frame().await.unwrap();
            assert_eq!(frame.data[0], i);
        }
        assert!(source.capture_frame().await.is_err());
    }

    #[tokio::test]
    async fn looping_wraps_around() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 2);

        let mut source = ImageSequenceSource::new(dir.path()).looping(true);
        source.initialize().await.unwrap();
        for expected in [0u8, 1, 0, 1] {
            assert_eq!(source.capture_frame().await.unwrap().data[0], expected);
        }
    }

    #[tokio::test]
    async fn empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSequenceSource::new(dir.path());
        assert!(source.initialize().await.is_err());
    }
}
