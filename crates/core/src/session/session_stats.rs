use std::time::{Duration, Instant};

/// Per-session inference counters, summarised when capture stops.
/// Constant size however long the session runs.
#[derive(Clone, Debug)]
pub struct SessionStats {
    started: Instant,
    frames: usize,
    failures: usize,
    no_face: usize,
    total_inference_ms: f64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
            failures: 0,
            no_face: 0,
            total_inference_ms: 0.0,
        }
    }

    /// Records one completed inference call.
    pub fn record_frame(&mut self, inference: Duration, faces: usize) {
        self.frames += 1;
        if faces == 0 {
            self.no_face += 1;
        }
        self.total_inference_ms += inference.as_secs_f64() * 1000.0;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn frames_without_face(&self) -> usize {
        self.no_face
    }

    pub fn average_inference_ms(&self) -> Option<f64> {
        if self.frames == 0 {
            return None;
        }
        Some(self.total_inference_ms / self.frames as f64)
    }

    /// One-line report, or `None` if nothing was attempted.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.failures == 0 {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut summary = format!(
            "Session summary: {} frames ({} without a face), {} failed, {:.1}s",
            self.frames, self.no_face, self.failures, elapsed
        );
        if let Some(avg) = self.average_inference_ms() {
            summary.push_str(&format!(", avg inference {avg:.1}ms"));
        }
        if elapsed > 0.0 {
            summary.push_str(&format!(", {:.1} fps", self.frames as f64 / elapsed));
        }
        Some(summary)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
