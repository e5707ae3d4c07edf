use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use moodlens_core::capture::domain::camera::CameraConstraints;
use moodlens_core::session::session_config::SessionConfig;
use moodlens_core::shared::constants::{
    DEFAULT_MODELS_DIR, EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, FACE_DETECTOR_MODEL_NAME,
    FACE_DETECTOR_MODEL_URL, POLL_INTERVAL, SMOOTHING_WINDOW_SIZE, WEIGHTS_BASE_URL,
    WEIGHT_FILE_NAMES,
};
use moodlens_core::shared::model_downloader::ModelResource;

/// Persisted defaults. Command-line flags override these per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window_size: usize,
    pub poll_interval_ms: u64,
    pub models_dir: PathBuf,
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub confidence: f64,
    pub overlay_output: Option<PathBuf>,
    pub face_model_url: String,
    pub expression_model_url: String,
    pub model_base_url: String,
    pub weight_files: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_size: SMOOTHING_WINDOW_SIZE,
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            device: None,
            width: None,
            height: None,
            confidence: 0.5,
            overlay_output: None,
            face_model_url: FACE_DETECTOR_MODEL_URL.to_string(),
            expression_model_url: EXPRESSION_MODEL_URL.to_string(),
            model_base_url: WEIGHTS_BASE_URL.to_string(),
            weight_files: WEIGHT_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("MoodLens").join("settings.json"))
    }

    /// Loads the user's settings, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("No configuration directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.window_size == 0 {
            return Err("Window size must be at least 1".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be at least 1 ms".into());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )
            .into());
        }
        if self.width.is_some() != self.height.is_some() {
            return Err("--width and --height must be given together".into());
        }
        if self.weight_files.is_empty() {
            return Err("At least one weight file name is required".into());
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            window_size: self.window_size,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            models_dir: self.models_dir.clone(),
            constraints: CameraConstraints {
                device: self.device.clone(),
                ideal_width: self.width,
                ideal_height: self.height,
                ..Default::default()
            },
            model_resources: vec![
                ModelResource::new(FACE_DETECTOR_MODEL_NAME, self.face_model_url.as_str()),
                ModelResource::new(EXPRESSION_MODEL_NAME, self.expression_model_url.as_str()),
            ],
            weights_base_url: self.model_base_url.clone(),
            weight_files: self.weight_files.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load_from(&dir.path().join("nope.json")), Settings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MoodLens").join("settings.json");
        let settings = Settings {
            window_size: 5,
            device: Some("/dev/video2".into()),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "window_size": 3 }"#).unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.window_size, 3);
        assert_eq!(settings.poll_interval_ms, 120);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_window = Settings {
            window_size: 0,
            ..Settings::default()
        };
        assert!(zero_window.validate().is_err());

        let bad_confidence = Settings {
            confidence: 1.5,
            ..Settings::default()
        };
        assert!(bad_confidence.validate().is_err());

        let half_size = Settings {
            width: Some(640),
            ..Settings::default()
        };
        assert!(half_size.validate().is_err());

        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_session_config_carries_camera_constraints() {
        let settings = Settings {
            device: Some("1".into()),
            width: Some(1280),
            height: Some(720),
            poll_interval_ms: 50,
            ..Settings::default()
        };
        let config = settings.session_config();
        assert_eq!(config.constraints.device.as_deref(), Some("1"));
        assert_eq!(config.constraints.ideal_width, Some(1280));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_session_config_downloads_loadable_models() {
        let settings = Settings {
            expression_model_url: "http://mirror/fer.onnx".into(),
            ..Settings::default()
        };
        let resources = settings.session_config().download_resources();
        let fer = resources
            .iter()
            .find(|r| r.name == EXPRESSION_MODEL_NAME)
            .unwrap();
        assert_eq!(fer.url, "http://mirror/fer.onnx");
        assert!(resources.iter().any(|r| r.name == FACE_DETECTOR_MODEL_NAME));
        assert_eq!(resources.len(), 2 + settings.weight_files.len());
    }
}
