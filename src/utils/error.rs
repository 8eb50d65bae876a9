use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model is not compatible: {0}")]
    ModelCompatibility(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] safetensors::SafeTensorError),

    #[error("Pickle error: {0}")]
    Pickle(#[from] candle_core::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            VisionError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            VisionError::ModelCompatibility(_) => "MODEL_COMPATIBILITY_ERROR",
            VisionError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            VisionError::Inference(_) => "INFERENCE_ERROR",
            VisionError::InvalidInput(_) => "INVALID_INPUT",
            VisionError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            VisionError::Checkpoint(_) => "CHECKPOINT_ERROR",
            VisionError::Pickle(_) => "PICKLE_ERROR",
            VisionError::Archive(_) => "ARCHIVE_ERROR",
            VisionError::Io(_) => "IO_ERROR",
            VisionError::Json(_) => "JSON_ERROR",
            VisionError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            VisionError::Ort(_) => "ORT_ERROR",
            VisionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 记录错误日志，附带错误码
    pub fn log(&self) {
        if self.is_input_error() {
            tracing::warn!("{} ({})", self, self.error_code());
        } else {
            tracing::error!("{} ({})", self, self.error_code());
        }
    }

    /// 输入类错误（缺失参数、图像无法解码）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VisionError::InvalidInput(_)
                | VisionError::ImageDecode(_)
                | VisionError::UnsupportedFormat(_)
        )
    }
}
