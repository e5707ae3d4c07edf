use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;

use crate::overlay::domain::overlay_renderer::{OverlayRenderer, RenderError};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{OVERLAY_STROKE_RGBA, OVERLAY_STROKE_WIDTH};
use crate::shared::frame::Frame;

/// Off-screen RGBA overlay surface built on the `image` crate.
///
/// When a snapshot path is configured, every [`present`](OverlayRenderer::present)
/// writes the surface there as PNG, replacing the previous snapshot atomically.
/// Inside a tokio runtime the encode runs on the blocking pool; a present
/// that arrives while the previous write is still running is skipped.
pub struct ImageOverlayRenderer {
    surface: image::RgbaImage,
    snapshot: Option<PathBuf>,
    pending: Option<JoinHandle<()>>,
}

impl ImageOverlayRenderer {
    pub fn new() -> Self {
        Self {
            surface: image::RgbaImage::new(0, 0),
            snapshot: None,
            pending: None,
        }
    }

    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: Some(path.into()),
            ..Self::new()
        }
    }

    pub fn surface(&self) -> &image::RgbaImage {
        &self.surface
    }

    /// Waits for the snapshot write in flight, if any.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Err(e) = pending.await {
                log::warn!("Overlay snapshot task failed: {e}");
            }
        }
    }

    /// Fills the clipped half-open pixel range `[x0, x1) x [y0, y1)`.
    fn fill(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let (w, h) = (self.surface.width() as i64, self.surface.height() as i64);
        let color = image::Rgba(OVERLAY_STROKE_RGBA);
        for y in y0.max(0)..y1.min(h) {
            for x in x0.max(0)..x1.min(w) {
                self.surface.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

impl Default for ImageOverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRenderer for ImageOverlayRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        if self.surface.dimensions() != (width, height) {
            self.surface = image::RgbaImage::new(width, height);
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.surface.pixels_mut() {
            *pixel = image::Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_frame(&mut self, frame: &Frame) {
        let (w, h) = self.surface.dimensions();
        if frame.is_empty() || w == 0 || h == 0 {
            return;
        }
        let Some(rgb) =
            image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        else {
            log::warn!("Skipping malformed frame {}", frame.sequence());
            return;
        };
        if rgb.dimensions() == (w, h) {
            for (dst, src) in self.surface.pixels_mut().zip(rgb.pixels()) {
                let [r, g, b] = src.0;
                *dst = image::Rgba([r, g, b, 255]);
            }
            return;
        }
        let rgb = image::imageops::resize(&rgb, w, h, image::imageops::FilterType::Triangle);
        let rgba = image::DynamicImage::ImageRgb8(rgb).into_rgba8();
        image::imageops::replace(&mut self.surface, &rgba, 0, 0);
    }

    /// Strokes `rect` centred on its edges, like a 2D canvas `strokeRect`.
    fn stroke_rect(&mut self, rect: &BoundingBox) {
        let half = (OVERLAY_STROKE_WIDTH / 2) as i64;
        let width = OVERLAY_STROKE_WIDTH as i64;
        let left = rect.x.round() as i64;
        let top = rect.y.round() as i64;
        let right = rect.right().round() as i64;
        let bottom = rect.bottom().round() as i64;

        self.fill(left - half, top - half, right - half + width, top - half + width);
        self.fill(left - half, bottom - half, right - half + width, bottom - half + width);
        self.fill(left - half, top - half, left - half + width, bottom - half + width);
        self.fill(right - half, top - half, right - half + width, bottom - half + width);
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if self.surface.width() == 0 || self.surface.height() == 0 {
            return Ok(());
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return write_snapshot(&self.surface, path)
                .map_err(|e| RenderError::Present(e.to_string()));
        };
        if self.pending.as_ref().is_some_and(|p| !p.is_finished()) {
            log::debug!("Previous overlay snapshot still writing, skipping");
            return Ok(());
        }

        let surface = self.surface.clone();
        let path = path.clone();
        self.pending = Some(runtime.spawn_blocking(move || {
            if let Err(e) = write_snapshot(&surface, &path) {
                log::warn!("Could not write overlay snapshot {}: {e}", path.display());
            }
        }));
        Ok(())
    }
}

fn write_snapshot(
    surface: &image::RgbaImage,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("part");
    surface.save_with_format(&tmp, image::ImageFormat::Png)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: image::Rgba<u8> = image::Rgba(OVERLAY_STROKE_RGBA);

    #[test]
    fn test_resize_sets_dimensions() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(64, 48);
        assert_eq!(renderer.dimensions(), (64, 48));
    }

    #[test]
    fn test_draw_frame_stretches_to_surface() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(40, 40);
        renderer.draw_frame(&Frame::filled(20, 10, [50, 100, 200], 0));
        let [r, g, b, a] = renderer.surface().get_pixel(39, 39).0;
        assert!(r.abs_diff(50) <= 1 && g.abs_diff(100) <= 1 && b.abs_diff(200) <= 1);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_draw_frame_same_size_is_exact() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(6, 4);
        renderer.draw_frame(&Frame::filled(6, 4, [1, 2, 3], 0));
        assert!(renderer.surface().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_clear_makes_surface_transparent() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(8, 8);
        renderer.draw_frame(&Frame::filled(8, 8, [9, 9, 9], 0));
        renderer.clear();
        assert!(renderer.surface().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_stroke_rect_draws_outline_only() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(50, 50);
        renderer.stroke_rect(&BoundingBox::new(10.0, 10.0, 20.0, 20.0));

        let surface = renderer.surface();
        assert_eq!(*surface.get_pixel(10, 10), GREEN);
        assert_eq!(*surface.get_pixel(20, 10), GREEN);
        assert_eq!(*surface.get_pixel(30, 20), GREEN);
        assert_eq!(*surface.get_pixel(20, 30), GREEN);
        assert_eq!(surface.get_pixel(20, 20).0, [0, 0, 0, 0]);
        assert_eq!(surface.get_pixel(5, 5).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_stroke_rect_clips_to_surface() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(10, 10);
        renderer.stroke_rect(&BoundingBox::new(-5.0, -5.0, 100.0, 100.0));
        assert_eq!(renderer.dimensions(), (10, 10));
    }

    #[test]
    fn test_present_without_snapshot_is_noop() {
        let mut renderer = ImageOverlayRenderer::new();
        renderer.resize(4, 4);
        assert!(renderer.present().is_ok());
    }

    #[test]
    fn test_present_writes_png_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overlay.png");
        let mut renderer = ImageOverlayRenderer::with_snapshot(&path);
        renderer.resize(16, 12);
        renderer.draw_frame(&Frame::filled(16, 12, [10, 20, 30], 0));
        renderer.stroke_rect(&BoundingBox::new(2.0, 2.0, 8.0, 6.0));
        renderer.present().unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (16, 12));
        assert_eq!(*img.get_pixel(2, 2), GREEN);
        assert_eq!(img.get_pixel(14, 10).0, [10, 20, 30, 255]);
        assert!(!path.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_present_in_runtime_writes_after_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let mut renderer = ImageOverlayRenderer::with_snapshot(&path);
        renderer.resize(8, 8);
        renderer.draw_frame(&Frame::filled(8, 8, [40, 50, 60], 0));

        renderer.present().unwrap();
        renderer.flush().await;

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(4, 4).0, [40, 50, 60, 255]);
        assert!(renderer.pending.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_captures_surface_at_present_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let mut renderer = ImageOverlayRenderer::with_snapshot(&path);
        renderer.resize(4, 4);
        renderer.draw_frame(&Frame::filled(4, 4, [200, 0, 0], 0));

        renderer.present().unwrap();
        renderer.clear();
        renderer.flush().await;

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [200, 0, 0, 255]);
    }
}
