//! Software camera producing an animated test pattern
//!
//! Used when no webcam backend is compiled in, and in tests.

use super::{CameraBackend, FrameSource, RgbFrame};
use crate::{CostumeError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    denial: Option<String>,
    open_streams: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            denial: None,
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A camera whose `open` always fails, as when permission is denied
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            denial: Some(reason.into()),
            ..Self::new(1, 1)
        }
    }

    /// Streams currently holding the device
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl CameraBackend for SyntheticCamera {
    fn name(&self) -> String {
        format!("synthetic camera {}x{}", self.width, self.height)
    }

    fn open(&self) -> Result<Box<dyn FrameSource>> {
        if let Some(reason) = &self.denial {
            return Err(CostumeError::DeviceError(reason.clone()));
        }
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticSource {
            width: self.width,
            height: self.height,
            tick: 0,
            open_streams: Arc::clone(&self.open_streams),
        }))
    }
}

struct SyntheticSource {
    width: u32,
    height: u32,
    tick: u32,
    open_streams: Arc<AtomicUsize>,
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> Result<RgbFrame> {
        self.tick = self.tick.wrapping_add(1);
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x * 255) / self.width) as u8;
                let g = ((y * 255) / self.height) as u8;
                let b = (self.tick.wrapping_mul(4) % 256) as u8;
                pixels.extend_from_slice(&[r, g, b]);
            }
        }
        RgbFrame::new(self.width, self.height, pixels)
    }

    fn frame_interval(&self) -> Duration {
        FRAME_INTERVAL
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_changes_between_frames() {
        let camera = SyntheticCamera::new(4, 4);
        let mut source = camera.open().unwrap();
        let first = source.read_frame().unwrap();
        let second = source.read_frame().unwrap();
        assert_eq!(first.pixels.len(), 4 * 4 * 3);
        assert_ne!(first, second);
    }

    #[test]
    fn test_open_stream_accounting() {
        let camera = SyntheticCamera::new(2, 2);
        let source = camera.open().unwrap();
        assert_eq!(camera.open_streams(), 1);
        drop(source);
        assert_eq!(camera.open_streams(), 0);
    }
}
