pub mod capture;
pub mod config;
pub mod references;
pub mod verification;

// Re-export vision types for convenience
pub use faceid_vision::{distance, model, preprocess, video, Embedding, InputImage, Siamese};
pub use verification::{Thresholds, Verdict, VerifyError};
