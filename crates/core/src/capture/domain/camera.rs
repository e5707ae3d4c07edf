use async_trait::async_trait;
use thiserror::Error;

use crate::shared::frame::Frame;

/// Which way the requested camera should face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// What the session asks of a camera. Dimensions are ideals, not
/// guarantees: the stream reports the resolution it actually delivers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing_mode: FacingMode,
    /// Backend-specific device identifier; `None` picks the default device.
    pub device: Option<String>,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
}

#[derive(Error, Debug)]
pub enum CameraAccessError {
    #[error("permission to use the camera was denied")]
    PermissionDenied,
    #[error("no camera device available{}", .0.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    NoDevice(Option<String>),
    #[error("camera backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera stream has ended")]
    Ended,
    #[error("camera stream was released")]
    Released,
}

/// Source of live camera streams.
#[async_trait]
pub trait Camera: Send {
    async fn acquire(
        &mut self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraAccessError>;
}

/// A live, playing camera stream.
#[async_trait]
pub trait CameraStream: Send {
    /// Native `(width, height)` of delivered frames.
    fn resolution(&self) -> (u32, u32);

    /// The most recent frame. Waits for the first frame after acquisition.
    async fn current_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Stops every track of the stream. Idempotent.
    fn release(&mut self);

    /// Number of tracks still delivering frames.
    fn active_tracks(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints_face_user() {
        let c = CameraConstraints::default();
        assert_eq!(c.facing_mode, FacingMode::User);
        assert!(c.device.is_none());
    }

    #[test]
    fn test_no_device_message_names_device() {
        let e = CameraAccessError::NoDevice(Some("/dev/video3".into()));
        assert_eq!(e.to_string(), "no camera device available (/dev/video3)");
        let e = CameraAccessError::NoDevice(None);
        assert_eq!(e.to_string(), "no camera device available");
    }
}
