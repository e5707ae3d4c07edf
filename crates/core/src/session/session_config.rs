use std::path::PathBuf;
use std::time::Duration;

use crate::capture::domain::camera::CameraConstraints;
use crate::shared::constants::{
    DEFAULT_MODELS_DIR, EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, FACE_DETECTOR_MODEL_NAME,
    FACE_DETECTOR_MODEL_URL, POLL_INTERVAL, SMOOTHING_WINDOW_SIZE, WEIGHTS_BASE_URL,
    WEIGHT_FILE_NAMES,
};
use crate::shared::model_downloader::ModelResource;

/// Tunables for one [`MonitorSession`](super::monitor_session::MonitorSession).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Number of expression vectors averaged into the readout.
    pub window_size: usize,
    /// Delay between polling iterations.
    pub poll_interval: Duration,
    /// Where models are loaded from and weight files are downloaded to.
    pub models_dir: PathBuf,
    pub constraints: CameraConstraints,
    /// The ONNX models the detector loads, each with its own source.
    pub model_resources: Vec<ModelResource>,
    pub weights_base_url: String,
    pub weight_files: Vec<String>,
}

impl SessionConfig {
    /// Everything the download operation fetches: the loadable models first,
    /// then the published weight files under the base URL.
    pub fn download_resources(&self) -> Vec<ModelResource> {
        self.model_resources
            .iter()
            .cloned()
            .chain(
                self.weight_files
                    .iter()
                    .map(|name| ModelResource::under(&self.weights_base_url, name)),
            )
            .collect()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: SMOOTHING_WINDOW_SIZE,
            poll_interval: POLL_INTERVAL,
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            constraints: CameraConstraints::default(),
            model_resources: vec![
                ModelResource::new(FACE_DETECTOR_MODEL_NAME, FACE_DETECTOR_MODEL_URL),
                ModelResource::new(EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL),
            ],
            weights_base_url: WEIGHTS_BASE_URL.to_string(),
            weight_files: WEIGHT_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::REQUIRED_MODEL_FILES;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.window_size, 7);
        assert_eq!(config.poll_interval, Duration::from_millis(120));
        assert_eq!(config.models_dir, PathBuf::from("./models"));
        assert_eq!(config.weight_files.len(), 6);
        assert_eq!(config.model_resources.len(), 2);
    }

    #[test]
    fn test_download_fetches_every_file_the_detector_loads() {
        let names: Vec<String> = SessionConfig::default()
            .download_resources()
            .into_iter()
            .map(|r| r.name)
            .collect();
        for required in REQUIRED_MODEL_FILES {
            assert!(names.iter().any(|n| n == required), "{required} is never downloaded");
        }
    }

    #[test]
    fn test_download_resources_models_then_weights() {
        let config = SessionConfig {
            weights_base_url: "http://host/weights/".into(),
            weight_files: vec!["a-shard1".into()],
            ..SessionConfig::default()
        };
        let resources = config.download_resources();
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].name, FACE_DETECTOR_MODEL_NAME);
        assert_eq!(resources[1].name, EXPRESSION_MODEL_NAME);
        assert_eq!(resources[2].url, "http://host/weights/a-shard1");
    }
}
