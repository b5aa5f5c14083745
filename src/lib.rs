pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod server;
pub mod service;

pub use error::{FaceRole, SwapError};
pub use orchestrator::{Orchestrator, SourcePayload};

// Re-export vision types for convenience
pub use roleswap_vision::{codec, preprocess, Face, FaceLocator, FaceSwapper};
