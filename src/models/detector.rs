use crate::config::DetectionConfig;
use crate::image::{DetectionDecoder, ImageTransforms};
use crate::models::session::{self, ModelIo};
use crate::predict::Detection;
use crate::utils::error::VisionError;
use crate::{Config, Result};
use image::DynamicImage;
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// YOLO 风格目标检测器
pub struct Detector {
    session: Arc<Mutex<Session>>,
    io: ModelIo,
    input_size: u32,
    class_names: Vec<String>,
    config: DetectionConfig,
}

impl Detector {
    pub fn new(config: &Config) -> Result<Self> {
        let session =
            session::build_session(&config.detector_model, &config.onnx_config, "Detection")?;
        let io = session::discover_io(&session, "Detection")?;

        let input_size = Self::input_size_from_shape(io.input_shape.as_deref())
            .unwrap_or(config.detection.input_size);

        let class_names = session::metadata_class_names(&session).unwrap_or_default();
        if class_names.is_empty() {
            tracing::warn!("Detection model has no class names in metadata, using class ids");
        }

        tracing::info!(
            "Detection input size {}, {} named classes, conf={}, iou={}",
            input_size,
            class_names.len(),
            config.detection.conf_threshold,
            config.detection.iou_threshold
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            io,
            input_size,
            class_names,
            config: config.detection.clone(),
        })
    }

    /// 从 [N, 3, H, W] 中取正方形静态尺寸
    pub fn input_size_from_shape(shape: Option<&[i64]>) -> Option<u32> {
        match shape? {
            [_, _, h, w] if *h > 0 && h == w => u32::try_from(*h).ok(),
            _ => None,
        }
    }

    /// 单张图像目标检测
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let start_time = Instant::now();

        let (input, letterbox) = ImageTransforms::letterbox(image, self.input_size)?;
        let input_tensor = Tensor::from_array(input)?;

        let prediction = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.io.input_name.as_str() => input_tensor])?;

            match outputs.get(self.io.output_name.as_str()) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(VisionError::Inference(format!(
                        "Detection output '{}' not found. Available outputs: {:?}",
                        self.io.output_name, available_outputs
                    )));
                }
            }
        };
        tracing::debug!("Detection prediction shape: {:?}", prediction.shape());

        let detections = DetectionDecoder::new(&self.config).decode(
            &prediction.view(),
            &letterbox,
            &self.class_names,
        )?;

        tracing::info!(
            "Detected {} objects in {:.1}ms",
            detections.len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok(detections)
    }
}
