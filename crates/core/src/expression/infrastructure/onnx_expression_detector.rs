//! Expression detector backed by two ONNX Runtime models: BlazeFace for
//! face boxes, then an 8-class FER+ classifier on each face crop.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::blazeface::{open_session, runtime, BlazeFace};
use crate::expression::domain::expression_detector::{
    ExpressionDetector, FaceDetection, InferenceError, ModelLoadError,
};
use crate::expression::domain::expression_vector::{Channel, ExpressionVector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::REQUIRED_MODEL_FILES;
use crate::shared::frame::Frame;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// FER+ input resolution (grayscale, single channel).
const CLASSIFIER_INPUT_SIZE: usize = 64;

/// FER+ output order.
const FERPLUS_CHANNELS: [Channel; 8] = [
    Channel::Neutral,
    Channel::Happy,
    Channel::Surprise,
    Channel::Sad,
    Channel::Angry,
    Channel::Disgust,
    Channel::Fear,
    Channel::Contempt,
];

struct LoadedModels {
    faces: BlazeFace,
    classifier: ort::session::Session,
}

pub struct OnnxExpressionDetector {
    confidence: f64,
    models: Option<Arc<Mutex<LoadedModels>>>,
}

impl OnnxExpressionDetector {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            models: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }
}

impl Default for OnnxExpressionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE)
    }
}

#[async_trait]
impl ExpressionDetector for OnnxExpressionDetector {
    async fn load_models(&mut self, source: &Path) -> Result<(), ModelLoadError> {
        let [detector_name, classifier_name] = REQUIRED_MODEL_FILES;
        let detector_path = source.join(detector_name);
        let classifier_path = source.join(classifier_name);
        let confidence = self.confidence;

        let loaded = tokio::task::spawn_blocking(move || {
            load(&detector_path, &classifier_path, confidence)
        })
        .await
        .map_err(|e| ModelLoadError::Runtime {
            path: source.to_path_buf(),
            message: e.to_string(),
        })??;

        self.models = Some(Arc::new(Mutex::new(loaded)));
        Ok(())
    }

    async fn detect_faces(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<FaceDetection>, InferenceError> {
        let models = self.models.clone().ok_or(InferenceError::NotLoaded)?;
        if frame.is_empty() {
            return Err(InferenceError::Frame("frame has no pixels".into()));
        }
        let frame = frame.clone();

        tokio::task::spawn_blocking(move || {
            let mut models = models
                .lock()
                .map_err(|_| InferenceError::Runtime("model lock poisoned".into()))?;
            detect(&mut models, &frame)
        })
        .await
        .map_err(runtime)?
    }
}

fn load(
    detector_path: &Path,
    classifier_path: &Path,
    confidence: f64,
) -> Result<LoadedModels, ModelLoadError> {
    let faces = BlazeFace::load(detector_path, confidence)?;
    if !classifier_path.exists() {
        return Err(ModelLoadError::MissingResource(classifier_path.to_path_buf()));
    }
    let classifier = open_session(classifier_path).map_err(|e| ModelLoadError::Runtime {
        path: classifier_path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::debug!(
        "Loaded {} and {}",
        detector_path.display(),
        classifier_path.display()
    );
    Ok(LoadedModels { faces, classifier })
}

fn detect(models: &mut LoadedModels, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
    let boxes = models.faces.detect(frame)?;
    let mut detections = Vec::with_capacity(boxes.len());
    for scored in boxes {
        let crop = face_crop(frame, &scored.bounding_box, CLASSIFIER_INPUT_SIZE);
        let input = ort::value::Tensor::from_array(crop).map_err(runtime)?;
        let outputs = models.classifier.run(ort::inputs![input]).map_err(runtime)?;
        let logits = outputs[0].try_extract_array::<f32>().map_err(runtime)?;
        let logits: Vec<f32> = logits.iter().copied().collect();
        if logits.len() != FERPLUS_CHANNELS.len() {
            return Err(InferenceError::Runtime(format!(
                "expression model produced {} scores, expected {}",
                logits.len(),
                FERPLUS_CHANNELS.len()
            )));
        }
        detections.push(FaceDetection {
            bounding_box: scored.bounding_box,
            expressions: ExpressionVector::new(
                FERPLUS_CHANNELS.iter().cloned().zip(softmax(&logits)),
            ),
        });
    }
    Ok(detections)
}

/// Grayscale `size × size` crop of `face`, NCHW with raw 0-255 intensities.
fn face_crop(frame: &Frame, face: &BoundingBox, size: usize) -> ndarray::Array4<f32> {
    let area = face.clamped(frame.width() as f64, frame.height() as f64);
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, size, size));
    if area.area() == 0.0 {
        return tensor;
    }
    for y in 0..size {
        let src_y = area.y + (y as f64 + 0.5) * area.height / size as f64;
        for x in 0..size {
            let src_x = area.x + (x as f64 + 0.5) * area.width / size as f64;
            tensor[[0, 0, y, x]] = frame.luma(src_x as u32, src_y as u32);
        }
    }
    tensor
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits.iter().map(|&l| ((l - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
