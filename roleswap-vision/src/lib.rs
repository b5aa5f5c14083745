pub mod analyzer;
pub mod codec;
pub mod detector;
pub mod error;
pub mod face;
pub mod model;
pub mod preprocess;
pub mod swapper;

// Re-export commonly used types
pub use analyzer::OnnxFaceAnalyzer;
pub use error::VisionError;
pub use face::{Embedding, Face, FaceLocator, FaceSwapper};
pub use swapper::OnnxFaceSwapper;
