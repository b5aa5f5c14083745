use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Which image a face was expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRole {
    Source,
    Target,
}

impl fmt::Display for FaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceRole::Source => write!(f, "source"),
            FaceRole::Target => write!(f, "target"),
        }
    }
}

/// Request-level failure taxonomy. Every variant maps to a user-visible
/// message and an HTTP status; nothing here propagates as a crash.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("invalid source image: {0}")]
    InvalidInput(String),

    #[error("target image not found: {0}")]
    TargetNotFound(String),

    #[error("no face detected in {role} image")]
    NoFaceDetected { role: FaceRole },

    #[error("face swap produced no result")]
    SwapFailed,

    #[error("failed to encode result image: {0}")]
    Encode(String),

    #[error("unknown preset: {gender}/{role}")]
    UnknownPreset { gender: String, role: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SwapError {
    /// Caller-correctable failures are 400s, everything else is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SwapError::InvalidInput(_)
            | SwapError::NoFaceDetected { .. }
            | SwapError::UnknownPreset { .. }
            | SwapError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SwapError::TargetNotFound(_)
            | SwapError::SwapFailed
            | SwapError::Encode(_)
            | SwapError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SwapError {
    fn into_response(self) -> Response {
        log::error!("request failed: {self}");
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
