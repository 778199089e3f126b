//! OpenCV-backed webcam

use super::{CameraBackend, FrameSource, RgbFrame};
use crate::{CostumeError, Result};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info, warn};

fn device_error(context: &str, e: opencv::Error) -> CostumeError {
    CostumeError::DeviceError(format!("{}: {}", context, e))
}

/// Log the outcome of a capture property request; true when the driver took it
fn property_applied(property: &str, value: f64, outcome: opencv::Result<bool>) -> bool {
    match outcome {
        Ok(true) => true,
        Ok(false) => {
            debug!("[CAMERA] Driver ignored {} = {}", property, value);
            false
        }
        Err(e) => {
            warn!("[CAMERA] Failed to set {} = {}: {}", property, value, e);
            false
        }
    }
}

pub struct WebcamCamera {
    device_index: i32,
    width: u32,
    height: u32,
}

impl WebcamCamera {
    pub fn new(device_index: i32, width: u32, height: u32) -> Self {
        Self {
            device_index,
            width,
            height,
        }
    }
}

impl CameraBackend for WebcamCamera {
    fn name(&self) -> String {
        format!("webcam #{}", self.device_index)
    }

    fn open(&self) -> Result<Box<dyn FrameSource>> {
        let mut cap = VideoCapture::new(self.device_index, videoio::CAP_ANY)
            .map_err(|e| device_error("Failed to open camera", e))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(CostumeError::DeviceError(format!(
                "Camera #{} is not available",
                self.device_index
            )));
        }

        let width = self.width as f64;
        let height = self.height as f64;
        property_applied("frame width", width, cap.set(videoio::CAP_PROP_FRAME_WIDTH, width));
        property_applied("frame height", height, cap.set(videoio::CAP_PROP_FRAME_HEIGHT, height));
        info!(
            "[CAMERA] Opened webcam #{} at requested {}x{}",
            self.device_index, self.width, self.height
        );

        Ok(Box::new(WebcamSource {
            cap,
            frame: Mat::default(),
        }))
    }
}

struct WebcamSource {
    cap: VideoCapture,
    frame: Mat,
}

impl FrameSource for WebcamSource {
    fn read_frame(&mut self) -> Result<RgbFrame> {
        match self.cap.read(&mut self.frame) {
            Ok(true) if !self.frame.empty() => {}
            Ok(_) => {
                return Err(CostumeError::DeviceError(
                    "Camera stopped delivering frames".to_string(),
                ))
            }
            Err(e) => return Err(device_error("Failed to read frame", e)),
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| device_error("Failed to convert frame", e))?;

        let size = rgb
            .size()
            .map_err(|e| device_error("Failed to read frame size", e))?;
        let pixels = rgb
            .data_bytes()
            .map_err(|e| device_error("Failed to read frame data", e))?
            .to_vec();

        RgbFrame::new(size.width as u32, size.height as u32, pixels)
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            debug!("[CAMERA] Release reported: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_outcomes() {
        assert!(property_applied("frame width", 640.0, Ok(true)));
        assert!(!property_applied("frame width", 640.0, Ok(false)));
        let err = opencv::Error::new(opencv::core::StsError, "unsupported property");
        assert!(!property_applied("frame height", 480.0, Err(err)));
    }

    #[test]
    fn test_name_uses_device_index() {
        assert_eq!(WebcamCamera::new(2, 640, 480).name(), "webcam #2");
    }
}
