use std::path::Path;

use anyhow::{Context, Result};
use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

/// Model file names resolved inside the configured model directory.
pub const DETECTOR_MODEL_FILE: &str = "face_detection_yunet_2023mar.onnx";
pub const RECOGNIZER_MODEL_FILE: &str = "face_recognition_sface_2021dec.onnx";
pub const SWAPPER_MODEL_FILE: &str = "inswapper_128.onnx";

pub fn session_builder() -> Result<SessionBuilder> {
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder);
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

fn load(dir: &Path, file: &str) -> Result<Session> {
    let path = dir.join(file);
    session_builder()?
        .commit_from_file(&path)
        .with_context(|| format!("loading model {}", path.display()))
}

pub fn detector_session(dir: &Path) -> Result<Session> {
    load(dir, DETECTOR_MODEL_FILE)
}

pub fn recognizer_session(dir: &Path) -> Result<Session> {
    load(dir, RECOGNIZER_MODEL_FILE)
}

pub fn swapper_session(dir: &Path) -> Result<Session> {
    load(dir, SWAPPER_MODEL_FILE)
}
