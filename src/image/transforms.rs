use crate::image::ImagePreprocessor;
use crate::utils::error::VisionError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// letterbox 填充色
const PAD_VALUE: u8 = 114;

/// letterbox 变换参数，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl LetterboxInfo {
    /// 模型输入坐标 -> 原图坐标（裁剪到图像范围内）
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x) / self.scale;
        let oy = (y - self.pad_y) / self.scale;
        (
            ox.clamp(0.0, self.orig_width as f32),
            oy.clamp(0.0, self.orig_height as f32),
        )
    }
}

/// 图像变换工具集
pub struct ImageTransforms;

impl ImageTransforms {
    /// 保持宽高比缩放到 size x size，灰色填充，像素值缩放到 [0,1]
    pub fn letterbox(image: &DynamicImage, size: u32) -> Result<(Array4<f32>, LetterboxInfo)> {
        let (orig_w, orig_h) = image.dimensions();
        if size == 0 || orig_w == 0 || orig_h == 0 {
            return Err(VisionError::ImageProcessing(format!(
                "Cannot letterbox {}x{} image into {}x{}",
                orig_w, orig_h, size, size
            )));
        }

        let scale = (size as f32 / orig_w as f32).min(size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, size);

        let resized = imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);

        let pad_x = (size - new_w) / 2;
        let pad_y = (size - new_h) / 2;
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
        imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        let tensor = ImagePreprocessor::to_chw_tensor(&canvas, |_, v| v as f32 / 255.0);

        let info = LetterboxInfo {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            orig_width: orig_w,
            orig_height: orig_h,
        };
        tracing::debug!("Letterbox {}x{} -> {}: {:?}", orig_w, orig_h, size, info);

        Ok((tensor, info))
    }
}
