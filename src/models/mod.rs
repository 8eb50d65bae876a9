pub mod classifier;
pub mod detector;
pub mod session;

pub use classifier::Classifier;
pub use detector::Detector;
pub use session::{parse_class_names, ModelIo};
