pub mod pickle;

use crate::config::OnnxConfig;
use crate::models::session;
use crate::Result;
use safetensors::SafeTensors;
use serde::Serialize;
use std::path::Path;

/// 参数映射的表头行
pub const MAPPING_HEADER: &str = "Keys in the state_dict:";

/// 非映射文件的提示
pub const NOT_A_MAPPING: &str =
    "The loaded file is not a dictionary, it might be the full model.";

/// 权重文件格式，只读取结构不加载张量数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    SafeTensors,
    Onnx,
    PyTorch,
    Unknown,
}

impl CheckpointFormat {
    /// 根据文件头和扩展名判断格式
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        if Self::looks_like_safetensors(bytes) {
            return CheckpointFormat::SafeTensors;
        }

        // PyTorch: zip 归档或裸 pickle (PROTO 操作码)
        if pickle::is_zip_archive(bytes) || bytes.first() == Some(&0x80) {
            return CheckpointFormat::PyTorch;
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("onnx") => CheckpointFormat::Onnx,
            _ => CheckpointFormat::Unknown,
        }
    }

    /// 8 字节小端头长度 + JSON 头
    fn looks_like_safetensors(bytes: &[u8]) -> bool {
        let Some(len_bytes) = bytes.get(..8) else {
            return false;
        };
        let mut buf = [0u8; 8];
        buf.copy_from_slice(len_bytes);
        let header_len = u64::from_le_bytes(buf);

        header_len > 0
            && header_len <= (bytes.len() - 8) as u64
            && bytes.get(8) == Some(&b'{')
    }
}

/// 单个参数条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterEntry {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

impl ParameterEntry {
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// 模型输入/输出条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IoEntry {
    pub name: String,
    pub shape: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CheckpointContents {
    /// 参数名 -> 张量
    Mapping(Vec<ParameterEntry>),
    /// 完整模型
    FullModel {
        inputs: Vec<IoEntry>,
        outputs: Vec<IoEntry>,
    },
    Unrecognized {
        reason: String,
    },
}

impl CheckpointContents {
    pub fn is_mapping(&self) -> bool {
        matches!(self, CheckpointContents::Mapping(_))
    }

    /// 输出文本行
    pub fn render_lines(&self, verbose: bool) -> Vec<String> {
        match self {
            CheckpointContents::Mapping(entries) => {
                let mut lines = Vec::with_capacity(entries.len() + 1);
                lines.push(MAPPING_HEADER.to_string());
                for entry in entries {
                    if verbose {
                        lines.push(format!(
                            "{}\t{}\t{:?}",
                            entry.name, entry.dtype, entry.shape
                        ));
                    } else {
                        lines.push(entry.name.clone());
                    }
                }
                lines
            }
            CheckpointContents::FullModel { inputs, outputs } => {
                let mut lines = vec![NOT_A_MAPPING.to_string()];
                for input in inputs {
                    lines.push(format!("input  {} {:?}", input.name, input.shape));
                }
                for output in outputs {
                    lines.push(format!("output {} {:?}", output.name, output.shape));
                }
                lines
            }
            CheckpointContents::Unrecognized { reason } => {
                vec![NOT_A_MAPPING.to_string(), format!("({})", reason)]
            }
        }
    }
}

/// 读取并检查权重文件；文件无法读取时返回错误
pub fn inspect(path: &Path, onnx_config: &OnnxConfig) -> Result<CheckpointContents> {
    let bytes = std::fs::read(path)?;
    let format = CheckpointFormat::detect(path, &bytes);
    tracing::info!(
        "Inspecting {} ({} bytes, {:?})",
        path.display(),
        bytes.len(),
        format
    );

    match format {
        CheckpointFormat::SafeTensors => inspect_safetensors(&bytes),
        CheckpointFormat::Onnx => inspect_onnx(path, onnx_config),
        CheckpointFormat::PyTorch => pickle::inspect_pickle(&bytes),
        CheckpointFormat::Unknown => Ok(CheckpointContents::Unrecognized {
            reason: "unknown checkpoint format".to_string(),
        }),
    }
}

/// 解析 safetensors 头，按名称排序
pub fn inspect_safetensors(bytes: &[u8]) -> Result<CheckpointContents> {
    let tensors = SafeTensors::deserialize(bytes)?;

    let mut entries: Vec<ParameterEntry> = tensors
        .tensors()
        .into_iter()
        .map(|(name, view)| ParameterEntry {
            name,
            dtype: format!("{:?}", view.dtype()),
            shape: view.shape().to_vec(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let total: usize = entries.iter().map(ParameterEntry::num_elements).sum();
    tracing::debug!("{} tensors, {} parameters", entries.len(), total);

    Ok(CheckpointContents::Mapping(entries))
}

fn inspect_onnx(path: &Path, onnx_config: &OnnxConfig) -> Result<CheckpointContents> {
    let session = session::build_session(path, onnx_config, "Checkpoint")?;

    let inputs = session
        .inputs
        .iter()
        .map(|input| IoEntry {
            name: input.name.clone(),
            shape: input
                .input_type
                .tensor_shape()
                .map(|s| s.iter().copied().collect()),
        })
        .collect();
    let outputs = session
        .outputs
        .iter()
        .map(|output| IoEntry {
            name: output.name.clone(),
            shape: output
                .output_type
                .tensor_shape()
                .map(|s| s.iter().copied().collect()),
        })
        .collect();

    Ok(CheckpointContents::FullModel { inputs, outputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;
    use safetensors::Dtype;

    fn onnx_config() -> OnnxConfig {
        OnnxConfig {
            intra_threads: 1,
            optimization_level: 0,
        }
    }

    fn write_safetensors(path: &Path) {
        let weight = vec![0u8; 3 * 4 * 4];
        let bias = vec![0u8; 3 * 4];
        let tensors = vec![
            (
                "classifier.1.1.weight",
                TensorView::new(Dtype::F32, vec![3, 4], &weight).unwrap(),
            ),
            (
                "classifier.1.1.bias",
                TensorView::new(Dtype::F32, vec![3], &bias).unwrap(),
            ),
        ];
        let bytes = safetensors::serialize(tensors, &None).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn safetensors_keys_are_listed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_model.safetensors");
        write_safetensors(&path);

        let contents = inspect(&path, &onnx_config()).unwrap();
        assert!(contents.is_mapping());

        let CheckpointContents::Mapping(entries) = &contents else {
            panic!("expected mapping");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "classifier.1.1.bias");
        assert_eq!(entries[1].shape, vec![3, 4]);
        assert_eq!(entries[1].num_elements(), 12);
        assert_eq!(entries[1].dtype, "F32");

        let lines = contents.render_lines(false);
        assert_eq!(
            lines,
            vec![
                MAPPING_HEADER.to_string(),
                "classifier.1.1.bias".to_string(),
                "classifier.1.1.weight".to_string(),
            ]
        );
    }

    #[test]
    fn verbose_lines_include_dtype_and_shape() {
        let contents = CheckpointContents::Mapping(vec![ParameterEntry {
            name: "fc.weight".into(),
            dtype: "F32".into(),
            shape: vec![3, 1280],
        }]);
        assert_eq!(contents.render_lines(true)[1], "fc.weight\tF32\t[3, 1280]");
    }

    #[test]
    fn format_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        write_safetensors(&path);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(
            CheckpointFormat::detect(&path, &bytes),
            CheckpointFormat::SafeTensors
        );

        assert_eq!(
            CheckpointFormat::detect(Path::new("m.pth"), b"PK\x03\x04rest"),
            CheckpointFormat::PyTorch
        );
        assert_eq!(
            CheckpointFormat::detect(Path::new("m.onnx"), b"\x08\x07\x12"),
            CheckpointFormat::Onnx
        );
        assert_eq!(
            CheckpointFormat::detect(Path::new("notes.txt"), b"hello"),
            CheckpointFormat::Unknown
        );
    }

    #[test]
    fn pth_state_dict_lists_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_resnet_model.pth");
        // {'fc.weight': [], 'fc.bias': []}
        let mut bytes = vec![0x80, 0x02, b'}', b'('];
        for name in ["fc.weight", "fc.bias"] {
            bytes.push(b'X');
            bytes.extend((name.len() as u32).to_le_bytes());
            bytes.extend(name.as_bytes());
            bytes.push(b']');
        }
        bytes.extend([b'u', b'.']);
        std::fs::write(&path, bytes).unwrap();

        let contents = inspect(&path, &onnx_config()).unwrap();
        assert_eq!(
            contents.render_lines(false),
            vec![
                MAPPING_HEADER.to_string(),
                "fc.weight".to_string(),
                "fc.bias".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_file_gets_fallback_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let contents = inspect(&path, &onnx_config()).unwrap();
        assert!(!contents.is_mapping());
        assert_eq!(contents.render_lines(false)[0], NOT_A_MAPPING);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(inspect(Path::new("/no/such/checkpoint.safetensors"), &onnx_config()).is_err());
    }

    #[test]
    fn corrupt_safetensors_is_an_error() {
        let mut bytes = 16u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{not json at all");
        assert!(inspect_safetensors(&bytes).is_err());
    }

    #[test]
    fn full_model_lines_list_io() {
        let contents = CheckpointContents::FullModel {
            inputs: vec![IoEntry {
                name: "input".into(),
                shape: Some(vec![1, 3, 224, 224]),
            }],
            outputs: vec![IoEntry {
                name: "logits".into(),
                shape: Some(vec![1, 3]),
            }],
        };
        let lines = contents.render_lines(false);
        assert_eq!(lines[0], NOT_A_MAPPING);
        assert_eq!(lines[1], "input  input Some([1, 3, 224, 224])");
        assert_eq!(lines[2], "output logits Some([1, 3])");
    }
}
