use crate::config::OnnxConfig;
use crate::utils::error::VisionError;
use crate::Result;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use std::collections::BTreeMap;
use std::path::Path;

/// 元数据中保存类别名的键（按优先级）
const CLASS_NAME_KEYS: [&str; 2] = ["names", "class_labels"];

/// 模型输入输出信息
#[derive(Debug, Clone, PartialEq)]
pub struct ModelIo {
    pub input_name: String,
    /// 动态维度为 -1；非张量输入为 None
    pub input_shape: Option<Vec<i64>>,
    pub output_name: String,
    pub output_shape: Option<Vec<i64>>,
}

/// 创建 ONNX Runtime 会话
pub fn build_session(model_path: &Path, onnx_config: &OnnxConfig, kind: &str) -> Result<Session> {
    if !model_path.exists() {
        return Err(VisionError::ModelLoad(format!(
            "{} model not found: {}",
            kind,
            model_path.display()
        )));
    }

    tracing::info!("Loading {} model from: {}", kind.to_lowercase(), model_path.display());

    let level = match onnx_config.optimization_level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    };

    let session = Session::builder()?
        .with_optimization_level(level)?
        .with_intra_threads(onnx_config.intra_threads)?
        .commit_from_file(model_path)?;

    Ok(session)
}

/// 动态发现第一个输入和第一个输出
pub fn discover_io(session: &Session, kind: &str) -> Result<ModelIo> {
    let input = session.inputs.first().ok_or_else(|| {
        VisionError::ModelLoad(format!("{} model has no inputs", kind))
    })?;
    let output = session.outputs.first().ok_or_else(|| {
        VisionError::ModelLoad(format!("{} model has no outputs", kind))
    })?;

    // 记录所有可用输出用于调试
    for (i, output) in session.outputs.iter().enumerate() {
        tracing::debug!("{} output[{}]: '{}'", kind, i, output.name);
    }

    let io = ModelIo {
        input_name: input.name.clone(),
        input_shape: tensor_shape(&input.input_type),
        output_name: output.name.clone(),
        output_shape: tensor_shape(&output.output_type),
    };
    tracing::info!(
        "{} model input: '{}' {:?}, output: '{}' {:?}",
        kind,
        io.input_name,
        io.input_shape,
        io.output_name,
        io.output_shape
    );

    Ok(io)
}

fn tensor_shape(value_type: &ValueType) -> Option<Vec<i64>> {
    value_type
        .tensor_shape()
        .map(|shape| shape.iter().copied().collect())
}

/// 读取模型元数据中的类别名（若有）
pub fn metadata_class_names(session: &Session) -> Option<Vec<String>> {
    let metadata = match session.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::debug!("Model metadata unavailable: {}", e);
            return None;
        }
    };

    for key in CLASS_NAME_KEYS {
        match metadata.custom(key) {
            Ok(Some(raw)) => {
                let names = parse_class_names(&raw);
                if !names.is_empty() {
                    tracing::debug!("Class names from metadata '{}': {:?}", key, names);
                    return Some(names);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("Failed to read metadata '{}': {}", key, e),
        }
    }

    None
}

/// 解析类别名列表
///
/// 支持 `{0: 'a', 1: 'b'}`、`["a", "b"]` 和 `a,b` 三种写法。
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let raw = raw.trim();

    if raw.starts_with('[') {
        if let Ok(names) = serde_json::from_str::<Vec<String>>(raw) {
            return names;
        }
    }

    let body = raw
        .trim_start_matches(['{', '['])
        .trim_end_matches(['}', ']']);

    if raw.starts_with('{') {
        let mut indexed = BTreeMap::new();
        for entry in body.split(',') {
            if let Some((key, value)) = entry.split_once(':') {
                if let Ok(index) = key.trim().trim_matches(['\'', '"']).parse::<usize>() {
                    indexed.insert(index, unquote(value));
                }
            }
        }
        return indexed.into_values().filter(|n| !n.is_empty()).collect();
    }

    body.split(',')
        .map(unquote)
        .filter(|n| !n.is_empty())
        .collect()
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches(['\'', '"']).trim().to_string()
}

/// 维度是否匹配（负数表示动态维度）
pub fn dim_matches(actual: i64, expected: i64) -> bool {
    actual < 0 || actual == expected
}
