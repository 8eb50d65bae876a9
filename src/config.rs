use crate::utils::error::VisionError;
use crate::Result;
use std::path::PathBuf;

/// 默认分类模型路径
pub const DEFAULT_CLASSIFIER_MODEL: &str = "models/classifier.onnx";

/// 默认检测模型路径
pub const DEFAULT_DETECTOR_MODEL: &str = "models/detector.onnx";

#[derive(Debug, Clone)]
pub struct Config {
    /// 分类模型路径 (ONNX)
    pub classifier_model: PathBuf,

    /// 检测模型路径 (ONNX)
    pub detector_model: PathBuf,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 分类预处理配置
    pub preprocess: PreprocessConfig,

    /// 检测配置
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别 (0-3)
    pub optimization_level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// 输入边长，图像被直接缩放到 input_size x input_size
    pub input_size: u32,

    /// 每通道均值 (RGB)
    pub mean: [f32; 3],

    /// 每通道标准差 (RGB)
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        // ImageNet 统计量，与训练时一致
        Self {
            input_size: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// 置信度阈值
    pub conf_threshold: f32,

    /// NMS IoU阈值
    pub iou_threshold: f32,

    /// 最多保留的检测框数量
    pub max_detections: usize,

    /// 模型未声明输入尺寸时使用的边长
    pub input_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.05,
            iou_threshold: 0.7,
            max_detections: 300,
            input_size: 640,
        }
    }
}

impl Config {
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let intra_threads = match threads {
            Some(0) => {
                return Err(VisionError::InvalidInput(
                    "Thread count must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
        };

        Ok(Self {
            classifier_model: PathBuf::from(DEFAULT_CLASSIFIER_MODEL),
            detector_model: PathBuf::from(DEFAULT_DETECTOR_MODEL),
            onnx_config: OnnxConfig {
                intra_threads,
                optimization_level: 3,
            },
            preprocess: PreprocessConfig::default(),
            detection: DetectionConfig::default(),
        })
    }

    pub fn with_classifier_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.classifier_model = path.into();
        self
    }

    pub fn with_detector_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.detector_model = path.into();
        self
    }

    /// 覆盖检测阈值
    pub fn with_detection_thresholds(mut self, conf: f32, iou: f32) -> Result<Self> {
        for (name, value) in [("confidence", conf), ("IoU", iou)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VisionError::InvalidInput(format!(
                    "{} threshold must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        self.detection.conf_threshold = conf;
        self.detection.iou_threshold = iou;
        Ok(self)
    }
}
