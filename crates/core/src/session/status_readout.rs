use std::fmt;

use crate::expression::domain::dominant_emotion::DominantEmotion;

/// What the status line currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StatusReadout {
    /// Nothing smoothed yet, or capture stopped.
    #[default]
    Idle,
    /// The last single-shot analysis found no face.
    NoFace,
    Emotion(DominantEmotion),
}

impl fmt::Display for StatusReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusReadout::Idle => f.write_str("Emotion: — | Confidence: —%"),
            StatusReadout::NoFace => f.write_str("No face detected"),
            StatusReadout::Emotion(dominant) => write!(
                f,
                "Emotion: {} | Confidence: {}%",
                dominant.label(),
                dominant.confidence_percent
            ),
        }
    }
}
