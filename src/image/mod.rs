pub mod loader;
pub mod preprocessing;
pub mod postprocessing;
pub mod transforms;

pub use loader::ImageLoader;
pub use preprocessing::ImagePreprocessor;
pub use postprocessing::DetectionDecoder;
pub use transforms::{ImageTransforms, LetterboxInfo};
