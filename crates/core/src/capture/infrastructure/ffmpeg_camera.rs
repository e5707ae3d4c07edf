use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use crate::capture::domain::camera::{
    Camera, CameraAccessError, CameraConstraints, CameraStream, CaptureError, FacingMode,
};
use crate::shared::frame::Frame;

/// Captures from the platform camera through libavdevice
/// (`v4l2` on Linux, `avfoundation` on macOS, `dshow` on Windows).
///
/// Each acquired stream owns a decode thread that keeps only the most
/// recent frame, the way a playing `<video>` element does.
#[derive(Default)]
pub struct FfmpegCamera;

impl FfmpegCamera {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Camera for FfmpegCamera {
    async fn acquire(
        &mut self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraAccessError> {
        let target = CaptureTarget::resolve(constraints)?;
        if constraints.facing_mode == FacingMode::Environment {
            log::debug!(
                "Facing mode is not selectable on {}, using {}",
                target.format,
                target.device
            );
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (frame_tx, frame_rx) = watch::channel(None);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::Builder::new()
            .name("camera-decode".into())
            .spawn(move || run_capture(target, ready_tx, frame_tx, stop_flag))
            .map_err(|e| CameraAccessError::Backend(e.to_string()))?;

        let resolution = match ready_rx.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CameraAccessError::Backend(
                    "capture thread exited before opening the device".into(),
                ))
            }
        };

        log::info!("Camera opened at {}x{}", resolution.0, resolution.1);
        Ok(Box::new(FfmpegCameraStream {
            resolution,
            frames: frame_rx,
            stop,
            handle: Some(handle),
        }))
    }
}

pub struct FfmpegCameraStream {
    resolution: (u32, u32),
    frames: watch::Receiver<Option<Frame>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[async_trait]
impl CameraStream for FfmpegCameraStream {
    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    async fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.handle.is_none() {
            return Err(CaptureError::Released);
        }
        // a closed channel still holds the last frame; never hand it out again
        if self.frames.has_changed().is_err() {
            return Err(CaptureError::Ended);
        }
        let latest = self
            .frames
            .wait_for(|frame| frame.is_some())
            .await
            .map_err(|_| CaptureError::Ended)?;
        latest.clone().ok_or(CaptureError::Ended)
    }

    /// Signals the decode thread to stop. Inside a tokio runtime the join
    /// runs on the blocking pool so the caller never waits on device I/O.
    fn release(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || join_decode_thread(handle));
            }
            Err(_) => join_decode_thread(handle),
        }
    }

    fn active_tracks(&self) -> usize {
        match &self.handle {
            Some(handle) if !handle.is_finished() => 1,
            _ => 0,
        }
    }
}

fn join_decode_thread(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        log::warn!("Camera decode thread panicked");
    }
}

impl Drop for FfmpegCameraStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Device path plus the libavdevice input format that can open it.
struct CaptureTarget {
    format: &'static str,
    device: String,
    video_size: Option<String>,
}

impl CaptureTarget {
    fn resolve(constraints: &CameraConstraints) -> Result<Self, CameraAccessError> {
        let format = platform_format();
        let device = match (&constraints.device, default_device()) {
            (Some(device), _) => device.clone(),
            (None, Some(default)) => default.to_string(),
            (None, None) => return Err(CameraAccessError::NoDevice(None)),
        };
        let video_size = match (constraints.ideal_width, constraints.ideal_height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        };
        Ok(Self {
            format,
            device,
            video_size,
        })
    }
}

fn platform_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

fn default_device() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("0")
    } else if cfg!(target_os = "windows") {
        // dshow needs an explicit "video=<name>" device
        None
    } else {
        Some("/dev/video0")
    }
}

type ReadySender = oneshot::Sender<Result<(u32, u32), CameraAccessError>>;

fn run_capture(
    target: CaptureTarget,
    ready: ReadySender,
    frames: watch::Sender<Option<Frame>>,
    stop: Arc<AtomicBool>,
) {
    let mut input = match open_device(&target) {
        Ok(input) => input,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let Some(stream) = input.streams().best(ffmpeg_next::media::Type::Video) else {
        let _ = ready.send(Err(CameraAccessError::NoDevice(Some(target.device))));
        return;
    };
    let stream_index = stream.index();
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|ctx| ctx.decoder().video());
    let mut decoder = match decoder {
        Ok(decoder) => decoder,
        Err(e) => {
            let _ = ready.send(Err(CameraAccessError::Backend(e.to_string())));
            return;
        }
    };

    let (width, height) = (decoder.width(), decoder.height());
    let scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    );
    let mut scaler = match scaler {
        Ok(scaler) => scaler,
        Err(e) => {
            let _ = ready.send(Err(CameraAccessError::Backend(e.to_string())));
            return;
        }
    };

    if ready.send(Ok((width, height))).is_err() {
        return;
    }

    let mut sequence = 0u64;
    for (packet_stream, packet) in input.packets() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if packet_stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = scaler.run(&decoded, &mut rgb) {
                log::warn!("Dropping camera frame: {e}");
                continue;
            }
            let pixels = extract_rgb_pixels(&rgb, width, height);
            frames.send_replace(Some(Frame::new(pixels, width, height, sequence)));
            sequence += 1;
        }
    }
    if stop.load(Ordering::Relaxed) {
        log::debug!("Camera decode thread exiting after {sequence} frames");
    } else {
        log::warn!("Camera stream ended unexpectedly after {sequence} frames");
    }
}

fn open_device(
    target: &CaptureTarget,
) -> Result<ffmpeg_next::format::context::Input, CameraAccessError> {
    ffmpeg_next::init().map_err(|e| CameraAccessError::Backend(e.to_string()))?;

    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == target.format)
        .ok_or_else(|| {
            CameraAccessError::Backend(format!("input format '{}' unavailable", target.format))
        })?;

    let mut options = ffmpeg_next::Dictionary::new();
    if let Some(size) = &target.video_size {
        options.set("video_size", size);
    }
    if target.format == "avfoundation" {
        options.set("framerate", "30");
    }

    let context = ffmpeg_next::format::open_with(
        &target.device,
        &ffmpeg_next::format::Format::Input(format),
        options,
    )
    .map_err(|e| map_open_error(e, &target.device))?;

    match context {
        ffmpeg_next::format::context::Context::Input(input) => Ok(input),
        ffmpeg_next::format::context::Context::Output(_) => Err(CameraAccessError::Backend(
            "device opened as an output".into(),
        )),
    }
}

fn map_open_error(error: ffmpeg_next::Error, device: &str) -> CameraAccessError {
    if let ffmpeg_next::Error::Other { errno } = error {
        match std::io::Error::from_raw_os_error(errno).kind() {
            ErrorKind::PermissionDenied => return CameraAccessError::PermissionDenied,
            ErrorKind::NotFound => return CameraAccessError::NoDevice(Some(device.to_string())),
            _ => {}
        }
    }
    CameraAccessError::Backend(error.to_string())
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
