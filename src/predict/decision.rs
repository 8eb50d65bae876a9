//! 分数向量 -> 类别与置信度

use crate::predict::{ClassLabel, Prediction};
use crate::utils::error::VisionError;
use crate::Result;

/// 数值稳定的 softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// 最大值索引，相等时取第一个
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if score <= b => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// 由原始分数得出预测结果
pub fn decide(scores: Vec<f32>, labels: &[ClassLabel]) -> Result<Prediction> {
    if scores.len() != labels.len() {
        return Err(VisionError::Inference(format!(
            "Model produced {} scores for {} class labels",
            scores.len(),
            labels.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(VisionError::Inference(format!(
            "Model produced a non-finite score: {}",
            bad
        )));
    }

    let class_index = argmax(&scores)
        .ok_or_else(|| VisionError::Inference("Model produced no scores".to_string()))?;
    let probabilities = softmax(&scores);
    let confidence = probabilities[class_index].clamp(0.0, 1.0);

    Ok(Prediction {
        label: labels[class_index],
        class_index,
        confidence,
        scores,
        probabilities,
    })
}
