use std::time::Duration;

/// Number of per-frame expression vectors averaged into the readout.
pub const SMOOTHING_WINDOW_SIZE: usize = 7;

/// Pause between polling loop iterations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(120);

pub const DEFAULT_MODELS_DIR: &str = "./models";

pub const FACE_DETECTOR_MODEL_NAME: &str = "blazeface.onnx";
pub const FACE_DETECTOR_MODEL_URL: &str =
    "https://github.com/moodlens/moodlens/releases/download/v0.1.0/blazeface.onnx";

pub const EXPRESSION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EXPRESSION_MODEL_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Files the ONNX expression detector loads from the models directory:
/// face detector first, then expression classifier.
pub const REQUIRED_MODEL_FILES: [&str; 2] = [FACE_DETECTOR_MODEL_NAME, EXPRESSION_MODEL_NAME];

pub const WEIGHTS_BASE_URL: &str =
    "https://raw.githubusercontent.com/justadudewhohacks/face-api.js/master/weights/";

pub const WEIGHT_FILE_NAMES: &[&str] = &[
    "tiny_face_detector_model-weights_manifest.json",
    "tiny_face_detector_model-shard1",
    "face_landmark_68_model-weights_manifest.json",
    "face_landmark_68_model-shard1",
    "face_expression_model-weights_manifest.json",
    "face_expression_model-shard1",
];

/// Overlay stroke colour for face rectangles (`#00FF00`).
pub const OVERLAY_STROKE_RGBA: [u8; 4] = [0, 255, 0, 255];
pub const OVERLAY_STROKE_WIDTH: u32 = 2;
