pub mod distance;
pub mod model;
pub mod preprocess;
pub mod video;

// Re-export commonly used types
pub use distance::{l1_distance, Embedding};
pub use model::{Siamese, SimilarityModel};
pub use preprocess::InputImage;
pub use video::{Camera, CropRegion};
