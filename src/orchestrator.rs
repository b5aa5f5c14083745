//! The request flow: decode → preprocess → locate → swap → postprocess →
//! encode. Strictly sequential; any failure aborts the remaining steps.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{info, warn};
use uuid::Uuid;

use roleswap_vision::{codec, preprocess, FaceLocator, FaceSwapper, VisionError};

use crate::error::{FaceRole, SwapError};

/// Result images are encoded at this JPEG quality.
pub const JPEG_QUALITY: u8 = 95;

/// One request's source image, as uploaded.
pub enum SourcePayload<'a> {
    Bytes(&'a [u8]),
    Base64(&'a str),
}

/// Composes the capabilities into a complete swap. Generic over the
/// locator and swapper so tests can substitute fakes for the models.
pub struct Orchestrator<L, S> {
    locator: L,
    swapper: S,
    debug_dir: PathBuf,
}

impl<L: FaceLocator, S: FaceSwapper> Orchestrator<L, S> {
    pub fn new(locator: L, swapper: S, debug_dir: PathBuf) -> Self {
        Self {
            locator,
            swapper,
            debug_dir,
        }
    }

    /// Full swap flow, returning the result as a bare base64 string.
    pub fn swap(
        &mut self,
        source: SourcePayload<'_>,
        target_path: &Path,
    ) -> Result<String, SwapError> {
        let jpeg = self.swap_jpeg(source, target_path)?;
        Ok(codec::to_base64(&jpeg))
    }

    /// Full swap flow, returning the encoded JPEG bytes.
    pub fn swap_jpeg(
        &mut self,
        source: SourcePayload<'_>,
        target_path: &Path,
    ) -> Result<Vec<u8>, SwapError> {
        let source_img = match source {
            SourcePayload::Bytes(bytes) => codec::decode(bytes),
            SourcePayload::Base64(payload) => codec::decode_base64(payload),
        }
        .map_err(|e| SwapError::InvalidInput(e.to_string()))?;

        let target_img = codec::decode_from_path(target_path)
            .map_err(|e| SwapError::TargetNotFound(e.to_string()))?;

        info!(
            "swapping: source {}x{}, target {}x{}",
            source_img.width(),
            source_img.height(),
            target_img.width(),
            target_img.height()
        );

        // Presets are curated, so only the upload is normalized.
        let source_img = preprocess::normalize(source_img);

        let source_faces = self.locator.locate(&source_img).map_err(internal)?;
        info!("detected {} face(s) in source image", source_faces.len());
        if source_faces.is_empty() {
            self.dump_debug_image(&source_img);
            return Err(SwapError::NoFaceDetected {
                role: FaceRole::Source,
            });
        }

        let target_faces = self.locator.locate(&target_img).map_err(internal)?;
        info!("detected {} face(s) in target image", target_faces.len());
        if target_faces.is_empty() {
            return Err(SwapError::NoFaceDetected {
                role: FaceRole::Target,
            });
        }

        // Primary face = first entry, i.e. the highest-scoring detection.
        let result = self
            .swapper
            .apply(&target_img, &target_faces[0], &source_faces[0])
            .map_err(internal)?
            .ok_or(SwapError::SwapFailed)?;

        let result = preprocess::adjust(&result, preprocess::RESULT_ALPHA, preprocess::RESULT_BETA);

        codec::encode_jpeg(&result, JPEG_QUALITY).map_err(|e| SwapError::Encode(e.to_string()))
    }

    /// Persist the preprocessed source for manual failure analysis. Best
    /// effort: a dump failure must not mask the detection error.
    fn dump_debug_image(&self, img: &DynamicImage) {
        let path = self
            .debug_dir
            .join(format!("noface-{}.jpg", Uuid::new_v4()));

        if let Err(e) = fs::create_dir_all(&self.debug_dir) {
            warn!("could not create debug directory: {e}");
            return;
        }

        let dumped = codec::encode_jpeg(img, JPEG_QUALITY)
            .map_err(anyhow::Error::new)
            .and_then(|bytes| fs::write(&path, bytes).map_err(anyhow::Error::new));

        match dumped {
            Ok(()) => info!("saved undetectable source image to {}", path.display()),
            Err(e) => warn!("could not save debug image to {}: {e}", path.display()),
        }
    }
}

fn internal(e: VisionError) -> SwapError {
    SwapError::Internal(anyhow::Error::new(e))
}
