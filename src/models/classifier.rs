use crate::models::session::{self, dim_matches, ModelIo};
use crate::predict::{ClassLabel, ScoreModel};
use crate::utils::error::VisionError;
use crate::{Config, Result};
use ndarray::Array4;
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// 三分类图像分类器 (civilian / military / uav)
pub struct Classifier {
    session: Arc<Mutex<Session>>,
    io: ModelIo,
    labels: Vec<ClassLabel>,
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        let session = session::build_session(
            &config.classifier_model,
            &config.onnx_config,
            "Classification",
        )?;
        let io = session::discover_io(&session, "Classification")?;

        let num_classes = ClassLabel::CANONICAL.len() as i64;
        Self::verify_shapes(&io, config.preprocess.input_size as i64, num_classes)?;

        let labels = Self::resolve_labels(session::metadata_class_names(&session))?;
        tracing::info!("Classification labels: {:?}", labels);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            io,
            labels,
        })
    }

    /// 检查模型结构：输入 [N, 3, S, S]，输出最后一维为类别数
    pub fn verify_shapes(io: &ModelIo, input_size: i64, num_classes: i64) -> Result<()> {
        if let Some(shape) = &io.input_shape {
            let expected = [1, 3, input_size, input_size];
            let ok = shape.len() == 4
                && shape
                    .iter()
                    .zip(expected)
                    .all(|(&actual, expected)| dim_matches(actual, expected));
            if !ok {
                return Err(VisionError::ModelCompatibility(format!(
                    "Expected classifier input [N, 3, {}, {}], model declares {:?}",
                    input_size, input_size, shape
                )));
            }
        }

        if let Some(shape) = &io.output_shape {
            let ok = shape
                .last()
                .map(|&last| dim_matches(last, num_classes))
                .unwrap_or(false);
            if !ok {
                return Err(VisionError::ModelCompatibility(format!(
                    "Expected classifier output with {} classes, model declares {:?}",
                    num_classes, shape
                )));
            }
        }

        Ok(())
    }

    /// 根据元数据确定标签顺序，无元数据时使用训练时顺序
    pub fn resolve_labels(names: Option<Vec<String>>) -> Result<Vec<ClassLabel>> {
        let Some(names) = names else {
            return Ok(ClassLabel::CANONICAL.to_vec());
        };

        let labels = names
            .iter()
            .map(|name| name.parse::<ClassLabel>())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                VisionError::ModelCompatibility(format!(
                    "Model metadata names {:?} do not match the known labels: {}",
                    names, e
                ))
            })?;

        let distinct: HashSet<_> = labels.iter().collect();
        if labels.len() != ClassLabel::CANONICAL.len() || distinct.len() != labels.len() {
            return Err(VisionError::ModelCompatibility(format!(
                "Model metadata names {:?} must list each of {:?} exactly once",
                names,
                ClassLabel::CANONICAL
            )));
        }

        if labels != ClassLabel::CANONICAL {
            tracing::warn!(
                "Model metadata orders labels as {:?}, overriding default order",
                labels
            );
        }

        Ok(labels)
    }
}

impl ScoreModel for Classifier {
    fn scores(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input.clone())?;

        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.io.input_name.as_str() => input_tensor])?;

            match outputs.get(self.io.output_name.as_str()) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(VisionError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.io.output_name, available_outputs
                    )));
                }
            }
        };

        let shape = predictions.shape().to_vec();
        if predictions.len() != self.labels.len() {
            return Err(VisionError::Inference(format!(
                "Expected {} scores for batch size 1, got output shape {:?}",
                self.labels.len(),
                shape
            )));
        }

        Ok(predictions.iter().copied().collect())
    }

    fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }
}
