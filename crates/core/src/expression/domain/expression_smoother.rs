use std::collections::VecDeque;

use super::dominant_emotion::DominantEmotion;
use super::expression_vector::{Channel, ExpressionVector};
use crate::shared::constants::SMOOTHING_WINDOW_SIZE;

/// Moving-average smoother over the most recent expression vectors.
///
/// The averaging divisor is the current window length, not the capacity,
/// so the first frames after a reset are not diluted by missing history.
///
/// The channel order is fixed by the first vector pushed into an empty
/// window; later vectors are re-ordered to it by channel name.
pub struct ExpressionSmoother {
    capacity: usize,
    layout: Vec<Channel>,
    window: VecDeque<Vec<f64>>,
}

impl ExpressionSmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            layout: Vec::new(),
            window: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Channel order of the current window. Empty until the first push.
    pub fn layout(&self) -> &[Channel] {
        &self.layout
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.layout.clear();
    }

    /// Appends `vector`, evicting the oldest entry on overflow, and returns
    /// the dominant emotion of the updated window.
    ///
    /// A vector whose channel set differs from the window's restarts the
    /// window from that vector. Returns `None` when the channel set is empty.
    pub fn push(&mut self, vector: ExpressionVector) -> Option<DominantEmotion> {
        let scores = match self.align(&vector) {
            Some(scores) => scores,
            None => {
                log::warn!(
                    "Expression channels changed mid-window ({} -> {}), restarting smoothing",
                    describe(&self.layout),
                    describe_vector(&vector)
                );
                self.reset();
                self.layout = vector.channels().cloned().collect();
                vector.scores().collect()
            }
        };

        self.window.push_back(scores);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.dominant()
    }

    /// Per-channel average over the window, in layout order.
    pub fn averages(&self) -> Vec<f64> {
        let n = self.window.len();
        let mut sums = vec![0.0; self.layout.len()];
        if n == 0 {
            return sums;
        }
        for scores in &self.window {
            for (sum, score) in sums.iter_mut().zip(scores) {
                *sum += score;
            }
        }
        sums.iter_mut().for_each(|s| *s /= n as f64);
        sums
    }

    /// The averaged window as an expression vector.
    pub fn average(&self) -> Option<ExpressionVector> {
        if self.window.is_empty() {
            return None;
        }
        Some(ExpressionVector::new(
            self.layout.iter().cloned().zip(self.averages()),
        ))
    }

    pub fn dominant(&self) -> Option<DominantEmotion> {
        if self.window.is_empty() {
            return None;
        }
        DominantEmotion::from_averages(&self.layout, &self.averages())
    }

    /// Window contents oldest-first, each in layout order.
    pub fn window(&self) -> Vec<ExpressionVector> {
        self.window
            .iter()
            .map(|scores| {
                ExpressionVector::new(self.layout.iter().cloned().zip(scores.iter().copied()))
            })
            .collect()
    }

    fn align(&mut self, vector: &ExpressionVector) -> Option<Vec<f64>> {
        if self.window.is_empty() {
            self.layout = vector.channels().cloned().collect();
            return Some(vector.scores().collect());
        }
        vector.scores_in(&self.layout)
    }
}

impl Default for ExpressionSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_WINDOW_SIZE)
    }
}

fn describe(layout: &[Channel]) -> String {
    layout.iter().map(Channel::name).collect::<Vec<_>>().join(",")
}

fn describe_vector(vector: &ExpressionVector) -> String {
    vector.channels().map(Channel::name).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(pairs: &[(&str, f64)]) -> ExpressionVector {
        ExpressionVector::from_named(pairs.iter().copied())
    }

    fn face_api(happy: f64, sad: f64) -> ExpressionVector {
        v(&[
            ("neutral", 0.0),
            ("happy", happy),
            ("sad", sad),
            ("angry", 0.0),
            ("fearful", 0.0),
            ("disgusted", 0.0),
            ("surprised", 0.0),
        ])
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(ExpressionSmoother::default().capacity(), 7);
    }

    #[test]
    fn test_single_push_is_argmax_of_sample() {
        let mut smoother = ExpressionSmoother::default();
        let d = smoother.push(v(&[("happy", 0.3), ("sad", 0.6), ("neutral", 0.1)])).unwrap();
        assert_eq!(d.channel, Channel::Sad);
        assert_eq!(d.confidence_percent, 60);
    }

    #[test]
    fn test_two_sample_average() {
        let mut smoother = ExpressionSmoother::default();
        smoother.push(v(&[("happy", 0.2), ("sad", 0.8)]));
        let d = smoother.push(v(&[("happy", 0.6), ("sad", 0.4)])).unwrap();

        let avg = smoother.average().unwrap();
        assert_relative_eq!(avg.score(&Channel::Happy).unwrap(), 0.4);
        assert_relative_eq!(avg.score(&Channel::Sad).unwrap(), 0.6);
        assert_eq!(d.channel, Channel::Sad);
        assert_eq!(d.label(), "Tristeza");
        assert_eq!(d.confidence_percent, 60);
    }

    #[test]
    fn test_unlisted_channel_labels_with_raw_name() {
        let mut smoother = ExpressionSmoother::default();
        let d = smoother.push(v(&[("fearful", 0.9), ("happy", 0.1)])).unwrap();
        assert_eq!(d.label(), "fearful");
        assert_eq!(d.channel.name(), "fearful");
        assert_eq!(d.confidence_percent, 90);
    }

    #[test]
    fn test_tie_keeps_first_channel_in_order() {
        let mut smoother = ExpressionSmoother::default();
        let d = smoother.push(v(&[("happy", 0.5), ("neutral", 0.5)])).unwrap();
        assert_eq!(d.channel, Channel::Happy);

        smoother.reset();
        let d = smoother.push(v(&[("neutral", 0.5), ("happy", 0.5)])).unwrap();
        assert_eq!(d.channel, Channel::Neutral);
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut smoother = ExpressionSmoother::new(7);
        for i in 0..20 {
            smoother.push(face_api(i as f64 / 20.0, 0.1));
            assert!(smoother.len() <= 7);
        }
        assert_eq!(smoother.len(), 7);
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let mut smoother = ExpressionSmoother::new(7);
        for i in 0..7 {
            smoother.push(face_api(i as f64 / 10.0, 0.0));
        }
        smoother.push(face_api(0.9, 0.0));

        let happy: Vec<f64> = smoother
            .window()
            .iter()
            .map(|e| e.score(&Channel::Happy).unwrap())
            .collect();
        assert_eq!(happy.len(), 7);
        assert_relative_eq!(happy[0], 0.1);
        assert_relative_eq!(happy[6], 0.9);
    }

    #[test]
    fn test_average_divides_by_window_length_not_capacity() {
        let mut smoother = ExpressionSmoother::new(7);
        smoother.push(face_api(0.9, 0.1));
        smoother.push(face_api(0.7, 0.1));
        let d = smoother.dominant().unwrap();
        assert_eq!(d.channel, Channel::Happy);
        assert_eq!(d.confidence_percent, 80);
    }

    #[test]
    fn test_reorders_later_vectors_to_first_layout() {
        let mut smoother = ExpressionSmoother::default();
        smoother.push(v(&[("happy", 0.2), ("sad", 0.8)]));
        smoother.push(v(&[("sad", 0.4), ("happy", 0.6)]));

        let names: Vec<_> = smoother.layout().iter().map(Channel::name).collect();
        assert_eq!(names, ["happy", "sad"]);
        let avg = smoother.averages();
        assert_relative_eq!(avg[0], 0.4);
        assert_relative_eq!(avg[1], 0.6);
    }

    #[test]
    fn test_channel_set_change_restarts_window() {
        let mut smoother = ExpressionSmoother::default();
        smoother.push(v(&[("happy", 0.9), ("sad", 0.1)]));
        smoother.push(v(&[("happy", 0.9), ("sad", 0.1)]));

        let d = smoother.push(v(&[("fear", 0.7), ("sad", 0.3)])).unwrap();

        assert_eq!(smoother.len(), 1);
        assert_eq!(d.channel, Channel::Fear);
        assert_eq!(d.confidence_percent, 70);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut smoother = ExpressionSmoother::default();
        smoother.push(v(&[("happy", 0.9), ("sad", 0.1)]));
        smoother.reset();

        assert!(smoother.is_empty());
        assert!(smoother.layout().is_empty());
        assert_eq!(smoother.dominant(), None);
        assert_eq!(smoother.average(), None);

        let d = smoother.push(v(&[("happy", 0.1), ("sad", 0.3)])).unwrap();
        assert_eq!(d.channel, Channel::Sad);
        assert_eq!(d.confidence_percent, 30);
    }

    #[test]
    fn test_empty_channel_set_is_degenerate() {
        let mut smoother = ExpressionSmoother::default();
        assert_eq!(smoother.push(ExpressionVector::default()), None);
        assert_eq!(smoother.len(), 1);
    }

    #[test]
    fn test_capacity_one_tracks_latest() {
        let mut smoother = ExpressionSmoother::new(1);
        smoother.push(v(&[("happy", 0.9), ("sad", 0.1)]));
        let d = smoother.push(v(&[("happy", 0.2), ("sad", 0.8)])).unwrap();
        assert_eq!(d.channel, Channel::Sad);
        assert_eq!(d.confidence_percent, 80);
    }

    #[test]
    fn test_zero_capacity_is_clamped_to_one() {
        assert_eq!(ExpressionSmoother::new(0).capacity(), 1);
    }
}
