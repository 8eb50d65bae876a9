pub mod annotate;
pub mod chart;

pub use annotate::annotate_detections;
pub use chart::{BarChart, ChartStyle, LabelHistogram};

use crate::predict::{Detection, Prediction};
use crate::Result;
use ab_glyph::FontVec;

/// 结果格式化器
pub struct ResultFormatter;

impl ResultFormatter {
    /// `<label> (<confidence>)`，置信度保留两位小数
    pub fn line(prediction: &Prediction) -> String {
        format!("{} ({:.2})", prediction.label, prediction.confidence)
    }

    pub fn json(prediction: &Prediction) -> Result<String> {
        Ok(serde_json::to_string_pretty(prediction)?)
    }

    /// `<label> <confidence> [x1, y1, x2, y2]`
    pub fn detection_line(detection: &Detection) -> String {
        format!(
            "{} {:.2} [{:.1}, {:.1}, {:.1}, {:.1}]",
            detection.label,
            detection.confidence,
            detection.x1,
            detection.y1,
            detection.x2,
            detection.y2
        )
    }
}

/// 从常见位置加载系统字体
pub fn load_system_font() -> Option<FontVec> {
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in &font_paths {
        if let Ok(font_data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(font_data) {
                tracing::debug!("Loaded system font: {}", path);
                return Some(font);
            }
        }
    }

    tracing::debug!("No system font found, text rendering will be skipped");
    None
}
