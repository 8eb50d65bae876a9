use crate::utils::error::VisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 分类类别（训练时的索引顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Civilian,
    Military,
    Uav,
}

impl ClassLabel {
    /// 训练时的标签索引顺序
    pub const CANONICAL: [ClassLabel; 3] =
        [ClassLabel::Civilian, ClassLabel::Military, ClassLabel::Uav];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Civilian => "civilian",
            ClassLabel::Military => "military",
            ClassLabel::Uav => "uav",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civilian" => Ok(ClassLabel::Civilian),
            "military" => Ok(ClassLabel::Military),
            "uav" => Ok(ClassLabel::Uav),
            other => Err(VisionError::InvalidInput(format!(
                "Unknown class label '{}'",
                other
            ))),
        }
    }
}

/// 单张图像的分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 预测类别
    pub label: ClassLabel,
    /// 类别在模型输出中的索引
    pub class_index: usize,
    /// 预测类别的 softmax 概率 (0.0 - 1.0)
    pub confidence: f32,
    /// 原始输出分数
    pub scores: Vec<f32>,
    /// softmax 概率分布
    pub probabilities: Vec<f32>,
}

/// 单个检测框，坐标为原图像素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}
