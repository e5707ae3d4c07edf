use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::event_log::EventLog;
use super::session_config::SessionConfig;
use super::session_state::SessionState;
use super::session_stats::SessionStats;
use super::status_readout::StatusReadout;
use crate::capture::domain::camera::{Camera, CameraAccessError, CameraStream, CaptureError};
use crate::expression::domain::expression_detector::{ExpressionDetector, InferenceError};
use crate::expression::domain::expression_smoother::ExpressionSmoother;
use crate::expression::domain::expression_vector::ExpressionVector;
use crate::overlay::domain::overlay_renderer::{draw_detections, OverlayRenderer};
use crate::shared::model_downloader::{download_all, DownloadOutcome};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("the camera is not running")]
    NotCapturing,
    #[error("the camera is already running")]
    AlreadyCapturing,
    #[error(transparent)]
    Camera(#[from] CameraAccessError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Everything one frame iteration touches. Locked as a unit so the polling
/// loop and single-shot analysis never interleave.
struct Pipeline {
    detector: Box<dyn ExpressionDetector>,
    renderer: Box<dyn OverlayRenderer>,
    smoother: ExpressionSmoother,
    stream: Option<Box<dyn CameraStream>>,
    event_log: Box<dyn EventLog>,
    stats: SessionStats,
    readout: watch::Sender<StatusReadout>,
}

impl Pipeline {
    /// Runs inference on the current frame, redraws the overlay and feeds
    /// the first face into the smoother.
    ///
    /// With no face, a single-shot call shows [`StatusReadout::NoFace`]; the
    /// polling loop leaves the readout as it was. The window is untouched
    /// either way.
    async fn process_frame(&mut self, single_shot: bool) -> Result<StatusReadout, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::NotCapturing)?;
        let frame = stream.current_frame().await?;

        let started = Instant::now();
        let detections = match self.detector.detect_faces(&frame).await {
            Ok(detections) => detections,
            Err(e) => {
                self.stats.record_failure();
                return Err(e.into());
            }
        };
        self.stats.record_frame(started.elapsed(), detections.len());

        draw_detections(
            self.renderer.as_mut(),
            &frame,
            detections.iter().map(|d| &d.bounding_box),
        );
        if let Err(e) = self.renderer.present() {
            log::warn!("{e}");
        }

        let Some(first) = detections.into_iter().next() else {
            if single_shot {
                self.readout.send_replace(StatusReadout::NoFace);
            }
            return Ok(self.readout.borrow().clone());
        };

        let readout = match self.smoother.push(first.expressions) {
            Some(dominant) => StatusReadout::Emotion(dominant),
            None => StatusReadout::Idle,
        };
        self.readout.send_replace(readout.clone());
        Ok(readout)
    }

    fn clear_overlay(&mut self) {
        self.renderer.clear();
        if let Err(e) = self.renderer.present() {
            log::warn!("{e}");
        }
    }
}

/// One camera monitoring session: camera lifecycle, the polling loop and
/// the smoothed emotion readout.
///
/// Created Idle. [`start`](Self::start) acquires the camera and spawns a
/// task that loads the models and then polls every `poll_interval` until
/// [`stop`](Self::stop).
pub struct MonitorSession {
    camera: Box<dyn Camera>,
    pipeline: Arc<Mutex<Pipeline>>,
    state: watch::Sender<SessionState>,
    readout: watch::Receiver<StatusReadout>,
    polling: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    http: reqwest::Client,
    config: SessionConfig,
}

impl MonitorSession {
    pub fn new(
        camera: Box<dyn Camera>,
        detector: Box<dyn ExpressionDetector>,
        renderer: Box<dyn OverlayRenderer>,
        event_log: Box<dyn EventLog>,
        config: SessionConfig,
    ) -> Self {
        let (readout_tx, readout_rx) = watch::channel(StatusReadout::Idle);
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let pipeline = Pipeline {
            detector,
            renderer,
            smoother: ExpressionSmoother::new(config.window_size),
            stream: None,
            event_log,
            stats: SessionStats::new(),
            readout: readout_tx,
        };
        Self {
            camera,
            pipeline: Arc::new(Mutex::new(pipeline)),
            state: state_tx,
            readout: readout_rx,
            polling: Arc::new(AtomicBool::new(false)),
            task: None,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Replaces the HTTP client used for model resource downloads.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// True while the polling loop is running (models loaded, capturing).
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    pub fn readout(&self) -> StatusReadout {
        self.readout.borrow().clone()
    }

    pub fn subscribe_readout(&self) -> watch::Receiver<StatusReadout> {
        self.readout.clone()
    }

    pub async fn window_len(&self) -> usize {
        self.pipeline.lock().await.smoother.len()
    }

    /// Smoothing window contents, oldest first.
    pub async fn smoothing_window(&self) -> Vec<ExpressionVector> {
        self.pipeline.lock().await.smoother.window()
    }

    pub async fn stats(&self) -> SessionStats {
        self.pipeline.lock().await.stats.clone()
    }

    /// Acquires the camera and starts capturing.
    ///
    /// On camera failure the session stays Idle. Model loading happens in
    /// the background; if it fails the camera stays live but no polling
    /// loop runs.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.state().is_capturing() {
            return Err(SessionError::AlreadyCapturing);
        }

        let stream = match self.camera.acquire(&self.config.constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                let mut pipeline = self.pipeline.lock().await;
                pipeline
                    .event_log
                    .error(&format!("Error accessing the camera: {e}"));
                return Err(e.into());
            }
        };

        {
            let mut pipeline = self.pipeline.lock().await;
            let (width, height) = stream.resolution();
            pipeline.renderer.resize(width, height);
            pipeline.stream = Some(stream);
            pipeline.stats = SessionStats::new();
            pipeline.event_log.info("Camera started.");
        }

        self.state.send_replace(SessionState::Capturing);
        self.task = Some(tokio::spawn(run_session(
            self.pipeline.clone(),
            self.state.subscribe(),
            self.polling.clone(),
            self.config.models_dir.clone(),
            self.config.poll_interval,
        )));
        Ok(())
    }

    /// Stops capturing. The in-flight iteration, if any, completes first.
    /// Returns `false` without doing anything when already Idle.
    pub async fn stop(&mut self) -> bool {
        if !self.state().is_capturing() {
            return false;
        }
        self.state.send_replace(SessionState::Idle);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Session task failed: {e}");
            }
        }
        self.polling.store(false, Ordering::Release);

        let mut pipeline = self.pipeline.lock().await;
        if let Some(mut stream) = pipeline.stream.take() {
            stream.release();
        }
        pipeline.clear_overlay();
        pipeline.readout.send_replace(StatusReadout::Idle);
        pipeline.smoother.reset();
        pipeline.event_log.info("Camera stopped.");
        if let Some(summary) = pipeline.stats.summary_string() {
            pipeline.event_log.info(&summary);
        }
        pipeline.stats = SessionStats::new();
        true
    }

    /// Runs exactly one inference on the current frame.
    pub async fn analyze_once(&mut self) -> Result<StatusReadout, SessionError> {
        if !self.state().is_capturing() {
            return Err(SessionError::NotCapturing);
        }
        let mut pipeline = self.pipeline.lock().await;
        match pipeline.process_frame(true).await {
            Ok(readout) => Ok(readout),
            Err(e) => {
                pipeline.event_log.error(&format!("Analysis error: {e}"));
                Err(e)
            }
        }
    }

    /// Fetches the detector's models and the published weight files into
    /// the models directory. Each file succeeds or fails on its own and gets
    /// its own log line.
    pub async fn download_model_resources(&self) -> Vec<DownloadOutcome> {
        let dest = &self.config.models_dir;
        let resources = self.config.download_resources();
        let outcomes = download_all(&self.http, &resources, dest).await;

        let mut pipeline = self.pipeline.lock().await;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(_) => pipeline.event_log.info(&format!(
                    "Downloaded: {} (saved to {})",
                    outcome.name,
                    dest.display()
                )),
                Err(e) => pipeline
                    .event_log
                    .error(&format!("Could not download {}: {e}", outcome.name)),
            }
        }
        outcomes
    }

    /// Stops capturing if needed and releases everything.
    pub async fn dispose(mut self) {
        self.stop().await;
    }
}

/// Background half of a capturing session: load models, then poll.
async fn run_session(
    pipeline: Arc<Mutex<Pipeline>>,
    mut state: watch::Receiver<SessionState>,
    polling: Arc<AtomicBool>,
    models_dir: PathBuf,
    interval: Duration,
) {
    {
        let mut guard = pipeline.lock().await;
        let p = &mut *guard;
        p.event_log
            .info(&format!("Loading models from {}", models_dir.display()));
        match p.detector.load_models(&models_dir).await {
            Ok(()) => p.event_log.info("Models loaded."),
            Err(e) => {
                p.event_log.error(&format!("Error loading models: {e}"));
                p.event_log.info(
                    "Analysis stays unavailable until the models load. \
                     Use download to fetch the model resources.",
                );
                return;
            }
        }
    }

    polling.store(true, Ordering::Release);
    while state.borrow_and_update().is_capturing() {
        {
            let mut p = pipeline.lock().await;
            if let Err(e) = p.process_frame(false).await {
                p.event_log.error(&format!("Loop error: {e}"));
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    polling.store(false, Ordering::Release);
    log::debug!("Polling loop exited");
}
