use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::error::VisionError;

/// Data-URI payloads carry a `data:image/jpeg;base64,` style prefix;
/// everything up to and including this marker is stripped before decoding.
const DATA_URI_MARKER: &str = "base64,";

/// Decode raw image bytes (JPEG, PNG, WebP, ...) into a pixel buffer.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::Decode("empty payload".to_string()));
    }
    let img =
        image::load_from_memory(bytes).map_err(|e| VisionError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(VisionError::ZeroDimensions);
    }
    Ok(img)
}

/// Decode a base64 string (with or without a data-URI prefix) into an image.
pub fn decode_base64(payload: &str) -> Result<DynamicImage, VisionError> {
    let bytes = from_base64(payload)?;
    decode(&bytes)
}

/// Decode an image from the file system.
pub fn decode_from_path(path: &Path) -> Result<DynamicImage, VisionError> {
    let bytes = std::fs::read(path)
        .map_err(|e| VisionError::NotFound(format!("{}: {}", path.display(), e)))?;
    decode(&bytes)
}

/// Serialize an image to JPEG at the given quality factor (0-100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(VisionError::Encode("zero-dimension buffer".to_string()));
    }
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(buffer)
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64, tolerating an optional data-URI prefix.
pub fn from_base64(payload: &str) -> Result<Vec<u8>, VisionError> {
    let raw = match payload.find(DATA_URI_MARKER) {
        Some(idx) => &payload[idx + DATA_URI_MARKER.len()..],
        None => payload,
    };
    STANDARD
        .decode(raw.trim())
        .map_err(|e| VisionError::Base64(e.to_string()))
}
