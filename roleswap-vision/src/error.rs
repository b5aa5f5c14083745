use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("cannot read image at {0}")]
    NotFound(String),

    #[error("unexpected model output: {0}")]
    ModelOutput(String),

    #[error(transparent)]
    Ort(#[from] ort::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
