//! Encoded still images
//!
//! A [`StillImage`] is the transport-ready form of a captured or generated
//! picture. Clones share the encoded bytes.

use super::RgbFrame;
use crate::{CostumeError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct StillImage {
    id: Uuid,
    bytes: Arc<[u8]>,
    mime_type: String,
    width: u32,
    height: u32,
}

impl StillImage {
    /// Wrap already encoded bytes, reading the dimensions from the header
    pub fn from_encoded(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self> {
        let decoded = image::load_from_memory(&bytes)?;
        Ok(Self {
            id: Uuid::new_v4(),
            width: decoded.width(),
            height: decoded.height(),
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        })
    }

    /// Decode a base64 payload as sent over the generation transport
    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| CostumeError::ImageError(format!("invalid base64 image data: {}", e)))?;
        Self::from_encoded(bytes, mime_type)
    }

    /// Unique id, stable across clones
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Decode to RGBA8 for display
    pub fn decode_rgba(&self) -> Result<image::RgbaImage> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgba8())
    }
}

impl PartialEq for StillImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StillImage {}

impl fmt::Debug for StillImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StillImage")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Encode a frame as a lossy JPEG still
pub fn encode_jpeg(frame: &RgbFrame, quality: u8) -> Result<StillImage> {
    let buffer = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| CostumeError::ImageError("frame does not match its dimensions".to_string()))?;

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&buffer)?;

    Ok(StillImage {
        id: Uuid::new_v4(),
        bytes: bytes.into(),
        mime_type: "image/jpeg".to_string(),
        width: frame.width,
        height: frame.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg() {
        let still = encode_jpeg(&RgbFrame::filled(16, 8, [200, 30, 30]), 90).unwrap();
        assert_eq!(still.mime_type(), "image/jpeg");
        assert_eq!(&still.bytes()[..2], &[0xFF, 0xD8]);
        assert_eq!((still.width(), still.height()), (16, 8));
    }

    #[test]
    fn test_base64_transport() {
        let still = encode_jpeg(&RgbFrame::filled(4, 4, [0, 0, 255]), 90).unwrap();
        let decoded = StillImage::from_base64(&still.to_base64(), "image/jpeg").unwrap();
        assert_eq!(decoded.bytes(), still.bytes());
        assert_eq!(decoded.width(), 4);
        // A re-decoded still is a distinct picture instance
        assert_ne!(decoded, still);
    }

    #[test]
    fn test_invalid_base64_is_image_error() {
        assert!(matches!(
            StillImage::from_base64("%%%not-base64%%%", "image/png"),
            Err(CostumeError::ImageError(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(StillImage::from_encoded(vec![1, 2, 3, 4], "image/png").is_err());
    }

    #[test]
    fn test_base64_is_jpeg() {
        let still = encode_jpeg(&RgbFrame::filled(2, 2, [1, 2, 3]), 90).unwrap();
        assert!(still.to_base64().starts_with("/9j/"));
    }

    #[test]
    fn test_clones_share_identity() {
        let still = encode_jpeg(&RgbFrame::filled(2, 2, [1, 2, 3]), 90).unwrap();
        let copy = still.clone();
        assert_eq!(copy, still);
        assert_eq!(copy.decode_rgba().unwrap().dimensions(), (2, 2));
    }
}
