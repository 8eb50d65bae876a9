pub mod decision;
pub mod pipeline;
pub mod types;

pub use decision::{argmax, decide, softmax};
pub use pipeline::{ClassificationPipeline, ScoreModel};
pub use types::{ClassLabel, Detection, Prediction};
