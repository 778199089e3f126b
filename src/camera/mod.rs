//! Camera capture adapter
//!
//! A [`CameraBackend`] opens the device and hands out a [`FrameSource`].
//! [`CaptureAdapter::start_preview`] turns that into a [`LivePreview`], which
//! owns a reader thread that keeps only the most recent frame. Dropping the
//! preview stops the thread and releases the device on every exit path.

mod still;
mod synthetic;
#[cfg(feature = "webcam")]
mod webcam;

pub use still::{encode_jpeg, StillImage};
pub use synthetic::SyntheticCamera;
#[cfg(feature = "webcam")]
pub use webcam::WebcamCamera;

use crate::{CostumeError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default still quality, matching a browser canvas export at 0.9
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// One uncompressed video frame, tightly packed RGB8
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbFrame {
    /// Create a frame, checking the buffer length against the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(CostumeError::ImageError(format!(
                "frame buffer has {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Horizontally flipped copy, for a selfie-style preview
    pub fn mirrored(&self) -> Self {
        let row_len = self.width as usize * 3;
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(row_len.max(1)) {
            for px in row.chunks_exact(3).rev() {
                pixels.extend_from_slice(px);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// A camera device that can be opened for streaming
pub trait CameraBackend: Send + Sync {
    /// Human readable device name for logs
    fn name(&self) -> String;

    /// Acquire the device.
    ///
    /// Fails with [`CostumeError::DeviceError`] when access is denied or no
    /// camera is present.
    fn open(&self) -> Result<Box<dyn FrameSource>>;
}

/// An acquired, streaming camera. Dropping it releases the device.
pub trait FrameSource: Send {
    /// Read the next frame, blocking until one is available
    fn read_frame(&mut self) -> Result<RgbFrame>;

    /// Pause between reads for sources that do not block on their own
    fn frame_interval(&self) -> Duration {
        Duration::ZERO
    }
}

/// Opens live previews on a configured backend
#[derive(Clone)]
pub struct CaptureAdapter {
    backend: Arc<dyn CameraBackend>,
    jpeg_quality: u8,
}

impl CaptureAdapter {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Set the JPEG quality used by `freeze_frame` (clamped to 1..=100)
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn device_name(&self) -> String {
        self.backend.name()
    }

    /// Acquire the camera and start streaming frames
    pub fn start_preview(&self) -> Result<LivePreview> {
        let name = self.backend.name();
        let source = self.backend.open().map_err(|e| {
            warn!("[CAMERA] Failed to open {}: {}", name, e);
            match e {
                CostumeError::DeviceError(_) => e,
                other => CostumeError::DeviceError(other.to_string()),
            }
        })?;
        info!("[CAMERA] Acquired {}", name);
        Ok(LivePreview::spawn(source, name, self.jpeg_quality))
    }
}

/// A running camera stream holding the latest frame
pub struct LivePreview {
    device_name: String,
    jpeg_quality: u8,
    latest: Arc<Mutex<Option<RgbFrame>>>,
    failure: Arc<Mutex<Option<String>>>,
    frames: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LivePreview {
    fn spawn(mut source: Box<dyn FrameSource>, device_name: String, jpeg_quality: u8) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let failure = Arc::new(Mutex::new(None));
        let frames = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let latest = Arc::clone(&latest);
            let failure = Arc::clone(&failure);
            let frames = Arc::clone(&frames);
            let running = Arc::clone(&running);
            let name = device_name.clone();

            thread::spawn(move || {
                debug!("[CAMERA] Reader thread started for {}", name);
                while running.load(Ordering::SeqCst) {
                    match source.read_frame() {
                        Ok(frame) => {
                            *latest.lock() = Some(frame);
                            frames.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            warn!("[CAMERA] Stream from {} failed: {}", name, e);
                            *failure.lock() = Some(e.to_string());
                            break;
                        }
                    }

                    let interval = source.frame_interval();
                    if !interval.is_zero() {
                        thread::sleep(interval);
                    }
                }
                drop(source);
                info!("[CAMERA] Released {}", name);
            })
        };

        Self {
            device_name,
            jpeg_quality,
            latest,
            failure,
            frames,
            running,
            worker: Some(worker),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Number of frames received so far; changes whenever a new frame lands
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Copy of the most recent frame, if any arrived yet
    pub fn latest_frame(&self) -> Option<RgbFrame> {
        self.latest.lock().clone()
    }

    /// Stream failure reported by the reader thread
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Whether the reader thread is still delivering frames
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.failure.lock().is_none()
    }

    /// Encode the current frame as a still image.
    ///
    /// Exactly one still per call; the stream keeps running.
    pub fn freeze_frame(&self) -> Result<StillImage> {
        if let Some(reason) = self.failure() {
            return Err(CostumeError::DeviceError(reason));
        }
        let frame = self.latest_frame().ok_or_else(|| {
            CostumeError::DeviceError("camera has not produced a frame yet".to_string())
        })?;
        let still = encode_jpeg(&frame, self.jpeg_quality)?;
        debug!(
            "[CAMERA] Froze {}x{} frame into {} byte still",
            still.width(),
            still.height(),
            still.len()
        );
        Ok(still)
    }

    /// Stop streaming and release the device
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("[CAMERA] Reader thread for {} panicked", self.device_name);
            }
        }
    }
}

impl Drop for LivePreview {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_for_frame(preview: &LivePreview) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while preview.frame_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_frame_length_is_checked() {
        assert!(RgbFrame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            RgbFrame::new(2, 2, vec![0; 11]),
            Err(CostumeError::ImageError(_))
        ));
    }

    #[test]
    fn test_mirrored_flips_rows() {
        let frame = RgbFrame::new(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.mirrored().pixels, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_preview_freezes_still() {
        let adapter = CaptureAdapter::new(Arc::new(SyntheticCamera::new(32, 24)));
        let preview = adapter.start_preview().unwrap();
        wait_for_frame(&preview);

        let still = preview.freeze_frame().unwrap();
        assert_eq!(still.mime_type(), "image/jpeg");
        assert_eq!((still.width(), still.height()), (32, 24));

        // Freezing does not end the stream
        assert!(preview.is_active());
        preview.stop();
    }

    #[test]
    fn test_unavailable_camera_is_device_error() {
        let adapter = CaptureAdapter::new(Arc::new(SyntheticCamera::unavailable(
            "Permission denied",
        )));
        match adapter.start_preview() {
            Err(CostumeError::DeviceError(msg)) => assert!(msg.contains("Permission denied")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("preview should not start"),
        }
    }

    #[test]
    fn test_drop_releases_device() {
        let camera = Arc::new(SyntheticCamera::new(8, 8));
        let adapter = CaptureAdapter::new(camera.clone());

        let preview = adapter.start_preview().unwrap();
        assert_eq!(camera.open_streams(), 1);
        drop(preview);
        assert_eq!(camera.open_streams(), 0);
    }

    #[test]
    fn test_jpeg_quality_is_clamped() {
        let adapter =
            CaptureAdapter::new(Arc::new(SyntheticCamera::new(4, 4))).with_jpeg_quality(0);
        assert_eq!(adapter.jpeg_quality(), 1);
    }
}
