use crate::config::PreprocessConfig;
use crate::utils::error::VisionError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 分类预处理：直接缩放到 input_size x input_size，归一化，转为 NCHW
    pub fn classification_tensor(
        image: &DynamicImage,
        config: &PreprocessConfig,
    ) -> Result<Array4<f32>> {
        Self::validate(config)?;

        let size = config.input_size;
        let rgb = image.to_rgb8();
        let resized = if rgb.dimensions() == (size, size) {
            rgb
        } else {
            imageops::resize(&rgb, size, size, FilterType::Triangle)
        };

        let tensor = Self::to_chw_tensor(&resized, |c, value| {
            (value as f32 / 255.0 - config.mean[c]) / config.std[c]
        });

        tracing::debug!("Classification input tensor shape: {:?}", tensor.shape());
        Ok(tensor)
    }

    /// RGB图像转为 [1, 3, H, W] 张量，每个像素值经过 `map(channel, value)`
    pub fn to_chw_tensor<F>(image: &RgbImage, map: F) -> Array4<f32>
    where
        F: Fn(usize, u8) -> f32,
    {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = map(c, pixel[c]);
            }
        }

        tensor
    }

    fn validate(config: &PreprocessConfig) -> Result<()> {
        if config.input_size == 0 {
            return Err(VisionError::InvalidInput(
                "Preprocess input size must be positive".to_string(),
            ));
        }
        if config.std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VisionError::InvalidInput(format!(
                "Normalization std must be positive, got {:?}",
                config.std
            )));
        }
        Ok(())
    }
}
