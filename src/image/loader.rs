use crate::utils::error::VisionError;
use crate::Result;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::path::Path;

/// 单边最大像素数，解码内存上限沿用 image 的默认值
pub const MAX_IMAGE_DIMENSION: u32 = 32_768;

pub struct ImageLoader;

impl ImageLoader {
    /// 从文件路径加载图像
    pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VisionError::InvalidInput(format!(
                "No such file: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        let image = Self::from_bytes(&bytes)?;

        let (width, height) = image.dimensions();
        tracing::debug!("Loaded image {} ({}x{})", path.display(), width, height);

        Ok(image)
    }

    /// 从字节加载图像，格式由内容判断而不是扩展名
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        let mut reader = ImageReader::new(Cursor::new(bytes));
        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                tracing::warn!("Decoding {:?} image, results may differ from training data", format);
            }
            reader.set_format(format);
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
        limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
        reader.limits(limits);

        let image = reader.decode()?;
        Self::validate_dimensions(&image)?;

        Ok(image)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }

    /// 验证图像尺寸
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(VisionError::InvalidInput(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        Ok(())
    }
}
