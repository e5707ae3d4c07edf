use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to present overlay: {0}")]
    Present(String),
}

/// 2D drawing surface that mirrors the video with face boxes on top.
///
/// Surface dimensions are set once per stream via [`resize`](Self::resize);
/// all drawing coordinates are surface pixels.
pub trait OverlayRenderer: Send {
    fn resize(&mut self, width: u32, height: u32);

    fn dimensions(&self) -> (u32, u32);

    fn clear(&mut self);

    /// Draws `frame` stretched to cover the whole surface.
    fn draw_frame(&mut self, frame: &Frame);

    fn stroke_rect(&mut self, rect: &BoundingBox);

    /// Makes the current surface contents visible. Default: no-op.
    fn present(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Clears the surface, redraws `frame`, and outlines every face box.
///
/// Boxes arrive in frame coordinates and are scaled to the surface.
pub fn draw_detections<'a>(
    renderer: &mut dyn OverlayRenderer,
    frame: &Frame,
    boxes: impl IntoIterator<Item = &'a BoundingBox>,
) {
    let (surface_w, surface_h) = renderer.dimensions();
    renderer.clear();
    renderer.draw_frame(frame);

    if frame.is_empty() {
        return;
    }
    let sx = surface_w as f64 / frame.width() as f64;
    let sy = surface_h as f64 / frame.height() as f64;
    for b in boxes {
        renderer.stroke_rect(&b.scaled(sx, sy));
    }
}
