//! BlazeFace short-range face detector on ONNX Runtime.
//!
//! Produces face boxes only; expression scoring happens downstream.

use std::path::Path;

use crate::expression::domain::expression_detector::{InferenceError, ModelLoadError};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub(super) struct BlazeFace {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

/// A face box with its detector score.
#[derive(Clone, Debug)]
pub(super) struct ScoredBox {
    pub bounding_box: BoundingBox,
    pub score: f64,
}

impl BlazeFace {
    pub fn load(model_path: &Path, confidence: f64) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::MissingResource(model_path.to_path_buf()));
        }
        let session = open_session(model_path).map_err(|e| ModelLoadError::Runtime {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }

    /// Face boxes in frame coordinates, highest score first.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<ScoredBox>, InferenceError> {
        let fw = frame.width() as f32;
        let fh = frame.height() as f32;

        let input =
            ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE)).map_err(runtime)?;
        let outputs = self.session.run(ort::inputs![input]).map_err(runtime)?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(InferenceError::Runtime(format!(
                "BlazeFace model expected 2 outputs, got {}",
                outputs.len()
            )));
        }
        let regressors = outputs[0].try_extract_array::<f32>().map_err(runtime)?;
        let scores = outputs[1].try_extract_array::<f32>().map_err(runtime)?;
        let reg_data = regressors
            .as_slice()
            .ok_or_else(|| InferenceError::Runtime("non-contiguous regressor output".into()))?;
        let score_data = scores
            .as_slice()
            .ok_or_else(|| InferenceError::Runtime("non-contiguous score output".into()))?;

        let mut raw = Vec::new();
        for (i, &logit) in score_data.iter().enumerate().take(self.anchors.len()) {
            let score = sigmoid(logit);
            if (score as f64) < self.confidence {
                continue;
            }
            let offset = i * REGRESSOR_STRIDE;
            if offset + 4 > reg_data.len() {
                break;
            }
            let anchor = self.anchors[i];
            let size = INPUT_SIZE as f32;
            let cx = anchor[0] + reg_data[offset] / size;
            let cy = anchor[1] + reg_data[offset + 1] / size;
            let w = reg_data[offset + 2] / size;
            let h = reg_data[offset + 3] / size;

            let x1 = ((cx - w / 2.0) * fw).max(0.0);
            let y1 = ((cy - h / 2.0) * fh).max(0.0);
            let x2 = ((cx + w / 2.0) * fw).min(fw);
            let y2 = ((cy + h / 2.0) * fh).min(fh);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            raw.push(ScoredBox {
                bounding_box: BoundingBox::from_corners(
                    x1 as f64, y1 as f64, x2 as f64, y2 as f64,
                ),
                score: score as f64,
            });
        }

        Ok(nms(raw, NMS_IOU_THRESH))
    }
}

pub(super) fn open_session(
    model_path: &Path,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?.commit_from_file(model_path)?)
}

pub(super) fn runtime(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::Runtime(e.to_string())
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell, then an 8×8
/// grid with 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for &(stride, per_cell) in &strides {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                anchors.extend(std::iter::repeat([cx, cy]).take(per_cell));
            }
        }
    }
    anchors
}

/// Greedy non-maximum suppression; survivors are ordered by score.
fn nms(mut boxes: Vec<ScoredBox>, iou_thresh: f64) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<ScoredBox> = Vec::new();
    for candidate in boxes {
        if keep
            .iter()
            .all(|k| k.bounding_box.iou(&candidate.bounding_box) <= iou_thresh)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
