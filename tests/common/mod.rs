//! Shared helpers for the integration tests.

#![allow(dead_code)]

/// Frame builders.
pub mod test_frames {
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use stock_tag::core::RgbFrame;

    pub const PREVIEW_W: u32 = 160;
    pub const PREVIEW_H: u32 = 120;

    /// Flat frame with no tag in it.
    pub fn blank(shade: u8) -> RgbFrame {
        RgbFrame::from(RgbImage::from_pixel(PREVIEW_W, PREVIEW_H, Rgb([shade, shade, shade])))
    }

    /// Frame showing a QR code for `payload` on a white background.
    pub fn qr(payload: &str) -> RgbFrame {
        let code = qrcode::QrCode::new(payload.as_bytes()).expect("payload fits in a QR code");
        let gray: GrayImage = code.render::<Luma<u8>>().min_dimensions(240, 240).build();
        RgbFrame::from(RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            Rgb([v, v, v])
        }))
    }
}

/// Capture sources driven by a script.
pub mod mock_capture {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use stock_tag::core::{RgbFrame, Size};
    use stock_tag::error::{TagError, TagResult};
    use stock_tag::session::CaptureSource;

    /// One scripted read.
    #[derive(Clone)]
    pub enum Step {
        Frame(RgbFrame),
        Fail,
        /// A failure that retrying cannot fix.
        Broken,
    }

    /// What happens once the script runs out.
    #[derive(Clone)]
    pub enum Then {
        Repeat(RgbFrame),
        FailForever,
    }

    /// Counters the test keeps after the source moved into a session.
    #[derive(Clone, Default)]
    pub struct Probe {
        pub reads: Arc<AtomicUsize>,
        pub shut_down: Arc<AtomicBool>,
    }

    impl Probe {
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn was_shut_down(&self) -> bool {
            self.shut_down.load(Ordering::SeqCst)
        }
    }

    pub struct ScriptedSource {
        script: VecDeque<Step>,
        then: Then,
        probe: Probe,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Step>, then: Then) -> (Self, Probe) {
            let probe = Probe::default();
            let source = Self {
                script: script.into(),
                then,
                probe: probe.clone(),
            };
            (source, probe)
        }
    }

    #[async_trait]
    impl CaptureSource for ScriptedSource {
        async fn initialize(&mut self) -> TagResult<()> {
            Ok(())
        }

        async fn capture_frame(&mut self) -> TagResult<RgbFrame> {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            let step = match self.script.pop_front() {
                Some(step) => step,
                None => match &self.then {
                    Then::Repeat(frame) => Step::Frame(frame.clone()),
                    Then::FailForever => Step::Fail,
                },
            };
            match step {
                Step::Frame(frame) => Ok(frame),
                Step::Fail => Err(TagError::frame_capture("scripted read failure")),
                Step::Broken => Err(TagError::state("closed", "capture_frame", "device handle lost")),
            }
        }

        fn input_size(&self) -> Size {
            Size { w: 160, h: 120 }
        }

        fn describe(&self) -> String {
            "mock:scripted".to_string()
        }

        async fn shutdown(&mut self) -> TagResult<()> {
            self.probe.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
