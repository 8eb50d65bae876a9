use crate::{
    config::PreprocessConfig,
    image::{ImageLoader, ImagePreprocessor},
    predict::{decision, ClassLabel, Prediction},
    Result,
};
use image::DynamicImage;
use ndarray::Array4;
use std::path::Path;
use std::time::Instant;

/// 输出固定长度分数向量的模型
pub trait ScoreModel {
    /// 单次前向推理，输入为 [1, 3, H, W]
    fn scores(&self, input: &Array4<f32>) -> Result<Vec<f32>>;

    /// 分数向量每个位置对应的类别
    fn labels(&self) -> &[ClassLabel];
}

impl<M: ScoreModel + ?Sized> ScoreModel for &M {
    fn scores(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        (**self).scores(input)
    }

    fn labels(&self) -> &[ClassLabel] {
        (**self).labels()
    }
}

/// 单张图像分类流水线：预处理 -> 推理 -> 决策
pub struct ClassificationPipeline<M> {
    model: M,
    preprocess: PreprocessConfig,
}

impl<M: ScoreModel> ClassificationPipeline<M> {
    pub fn new(model: M, preprocess: PreprocessConfig) -> Self {
        Self { model, preprocess }
    }

    /// 从文件路径分类
    pub fn classify_path(&self, path: impl AsRef<Path>) -> Result<Prediction> {
        let image = ImageLoader::from_path(path)?;
        self.classify_image(&image)
    }

    /// 分类已解码的图像
    pub fn classify_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let start_time = Instant::now();

        let tensor = ImagePreprocessor::classification_tensor(image, &self.preprocess)?;
        let preprocess_time = start_time.elapsed();

        let inference_start = Instant::now();
        let scores = self.model.scores(&tensor)?;
        let inference_time = inference_start.elapsed();

        let prediction = decision::decide(scores, self.model.labels())?;

        tracing::debug!(
            "Preprocess {:.1}ms, inference {:.1}ms, scores {:?}",
            preprocess_time.as_secs_f64() * 1000.0,
            inference_time.as_secs_f64() * 1000.0,
            prediction.scores
        );
        tracing::info!(
            "Classified as {} (confidence={:.4})",
            prediction.label,
            prediction.confidence
        );

        Ok(prediction)
    }
}
