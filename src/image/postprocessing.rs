use crate::config::DetectionConfig;
use crate::image::transforms::LetterboxInfo;
use crate::predict::Detection;
use crate::utils::error::VisionError;
use crate::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;

/// 模型输入坐标系下的候选框
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    class_id: usize,
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// YOLO 检测头输出解码 + NMS
pub struct DetectionDecoder<'a> {
    config: &'a DetectionConfig,
}

impl<'a> DetectionDecoder<'a> {
    pub fn new(config: &'a DetectionConfig) -> Self {
        Self { config }
    }

    /// 解码 [1, 4+nc, N] 或 [1, N, 4+nc] 输出
    pub fn decode(
        &self,
        output: &ArrayViewD<f32>,
        letterbox: &LetterboxInfo,
        class_names: &[String],
    ) -> Result<Vec<Detection>> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(VisionError::Inference(format!(
                "Unsupported detection output shape: {:?}. Expected (1, 4+classes, anchors)",
                shape
            )));
        }

        let rows = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|e| VisionError::Inference(e.to_string()))?;

        // 转为 [N, 4+nc]
        let rows = if Self::channels_first(shape, class_names.len()) {
            rows.reversed_axes()
        } else {
            rows
        };

        if rows.ncols() <= 4 {
            return Err(VisionError::Inference(format!(
                "Detection output has no class scores: {:?}",
                shape
            )));
        }

        let candidates = self.collect_candidates(&rows);
        tracing::debug!(
            "{} candidates above confidence {}",
            candidates.len(),
            self.config.conf_threshold
        );

        let kept = self.non_max_suppression(candidates);

        Ok(kept
            .into_iter()
            .map(|c| {
                let (x1, y1) = letterbox.to_original(c.x1, c.y1);
                let (x2, y2) = letterbox.to_original(c.x2, c.y2);
                let label = class_names
                    .get(c.class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", c.class_id));
                Detection {
                    class_id: c.class_id,
                    label,
                    confidence: c.score,
                    x1,
                    y1,
                    x2,
                    y2,
                }
            })
            .collect())
    }

    /// 判断输出是否为通道优先布局
    fn channels_first(shape: &[usize], num_classes: usize) -> bool {
        if num_classes > 0 {
            if shape[1] == num_classes + 4 {
                return true;
            }
            if shape[2] == num_classes + 4 {
                return false;
            }
        }
        // 锚点数量远大于通道数
        shape[1] < shape[2]
    }

    fn collect_candidates(&self, rows: &ArrayView2<f32>) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for row in rows.rows() {
            let scores = row.slice(ndarray::s![4..]);
            let mut best = (0usize, f32::NEG_INFINITY);
            for (i, &score) in scores.iter().enumerate() {
                if score > best.1 {
                    best = (i, score);
                }
            }

            if !best.1.is_finite() || best.1 < self.config.conf_threshold {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            candidates.push(Candidate {
                class_id: best.0,
                score: best.1,
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
            });
        }

        candidates
    }

    /// 按类别的 NMS，保留最高分框
    fn non_max_suppression(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let mut keep: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if keep.len() >= self.config.max_detections {
                break;
            }
            let suppressed = keep.iter().any(|k| {
                k.class_id == candidate.class_id && k.iou(&candidate) > self.config.iou_threshold
            });
            if !suppressed {
                keep.push(candidate);
            }
        }

        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn identity_letterbox() -> LetterboxInfo {
        LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_width: 640,
            orig_height: 640,
        }
    }

    fn names() -> Vec<String> {
        vec!["civilian".into(), "military".into(), "uav".into()]
    }

    /// 构造通道优先输出 [1, 7, N]
    fn output(boxes: &[([f32; 4], [f32; 3])]) -> Array3<f32> {
        let mut out = Array3::<f32>::zeros((1, 7, boxes.len()));
        for (i, (b, s)) in boxes.iter().enumerate() {
            for k in 0..4 {
                out[[0, k, i]] = b[k];
            }
            for k in 0..3 {
                out[[0, 4 + k, i]] = s[k];
            }
        }
        out
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() {
        let config = DetectionConfig::default();
        let out = output(&[
            ([100.0, 100.0, 50.0, 50.0], [0.9, 0.0, 0.0]),
            ([102.0, 101.0, 50.0, 50.0], [0.6, 0.0, 0.0]),
            ([400.0, 400.0, 40.0, 40.0], [0.0, 0.0, 0.3]),
        ]);
        let dets = DetectionDecoder::new(&config)
            .decode(&out.view().into_dyn(), &identity_letterbox(), &names())
            .unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].label, "civilian");
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(dets[0].x1, 75.0);
        assert_eq!(dets[0].y2, 125.0);
        assert_eq!(dets[1].label, "uav");
    }

    #[test]
    fn overlapping_boxes_of_different_classes_are_kept() {
        let config = DetectionConfig::default();
        let out = output(&[
            ([100.0, 100.0, 50.0, 50.0], [0.9, 0.0, 0.0]),
            ([100.0, 100.0, 50.0, 50.0], [0.0, 0.8, 0.0]),
        ]);
        let dets = DetectionDecoder::new(&config)
            .decode(&out.view().into_dyn(), &identity_letterbox(), &names())
            .unwrap();
        assert_eq!(dets.len(), 2);
    }

    #[test]
    fn low_scores_are_dropped() {
        let config = DetectionConfig::default();
        let out = output(&[([10.0, 10.0, 5.0, 5.0], [0.01, 0.04, 0.02])]);
        let dets = DetectionDecoder::new(&config)
            .decode(&out.view().into_dyn(), &identity_letterbox(), &names())
            .unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn transposed_layout_is_accepted() {
        let config = DetectionConfig::default();
        let out = output(&[([100.0, 100.0, 20.0, 20.0], [0.0, 0.7, 0.0])]);
        let transposed = out.view().permuted_axes([0, 2, 1]);
        let dets = DetectionDecoder::new(&config)
            .decode(&transposed.into_dyn(), &identity_letterbox(), &names())
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "military");
    }

    #[test]
    fn detections_are_capped() {
        let config = DetectionConfig {
            max_detections: 1,
            ..DetectionConfig::default()
        };
        let out = output(&[
            ([100.0, 100.0, 10.0, 10.0], [0.9, 0.0, 0.0]),
            ([300.0, 300.0, 10.0, 10.0], [0.8, 0.0, 0.0]),
        ]);
        let dets = DetectionDecoder::new(&config)
            .decode(&out.view().into_dyn(), &identity_letterbox(), &names())
            .unwrap();
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn unknown_class_gets_generic_name() {
        let config = DetectionConfig::default();
        // 没有类别名时按锚点数 > 通道数判断布局
        let mut boxes = vec![([100.0, 100.0, 10.0, 10.0], [0.0, 0.0, 0.9])];
        boxes.extend(std::iter::repeat(([0.0; 4], [0.0; 3])).take(9));
        let out = output(&boxes);
        let dets = DetectionDecoder::new(&config)
            .decode(&out.view().into_dyn(), &identity_letterbox(), &[])
            .unwrap();
        assert_eq!(dets[0].label, "class_2");
    }

    #[test]
    fn wrong_rank_is_an_error() {
        let config = DetectionConfig::default();
        let out = ndarray::Array2::<f32>::zeros((7, 3)).into_dyn();
        assert!(DetectionDecoder::new(&config)
            .decode(&out.view(), &identity_letterbox(), &names())
            .is_err());
    }
}
