use std::fmt;

/// One named emotion category reported by an expression detector.
///
/// Known categories get their own variant; anything else a detector emits
/// is carried verbatim in `Other` so it still takes part in smoothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    Contempt,
    Other(String),
}

impl Channel {
    /// Parses a detector's channel name. Only the exact table names map to
    /// known variants; any other spelling is kept verbatim.
    pub fn from_name(name: &str) -> Self {
        match name {
            "angry" => Channel::Angry,
            "disgust" => Channel::Disgust,
            "fear" => Channel::Fear,
            "happy" => Channel::Happy,
            "sad" => Channel::Sad,
            "surprise" => Channel::Surprise,
            "neutral" => Channel::Neutral,
            "contempt" => Channel::Contempt,
            _ => Channel::Other(name.to_string()),
        }
    }

    /// Canonical English channel name.
    pub fn name(&self) -> &str {
        match self {
            Channel::Angry => "angry",
            Channel::Disgust => "disgust",
            Channel::Fear => "fear",
            Channel::Happy => "happy",
            Channel::Sad => "sad",
            Channel::Surprise => "surprise",
            Channel::Neutral => "neutral",
            Channel::Contempt => "contempt",
            Channel::Other(name) => name,
        }
    }

    /// Localized label shown to the user. Channels outside the display
    /// table fall back to their raw name.
    pub fn display_name(&self) -> &str {
        match self {
            Channel::Angry => "Enojo",
            Channel::Disgust => "Asco",
            Channel::Fear => "Miedo",
            Channel::Happy => "Felicidad",
            Channel::Sad => "Tristeza",
            Channel::Surprise => "Sorpresa",
            Channel::Neutral => "Neutral",
            Channel::Contempt | Channel::Other(_) => self.name(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered channel → score mapping for one detected face in one frame.
///
/// Order is the detector's reporting order. Scores are nominally in
/// `[0, 1]` and are stored as reported.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionVector {
    entries: Vec<(Channel, f64)>,
}

impl ExpressionVector {
    /// Builds a vector from `(channel, score)` pairs. A repeated channel
    /// keeps its first position and takes the last score.
    pub fn new(pairs: impl IntoIterator<Item = (Channel, f64)>) -> Self {
        let mut entries: Vec<(Channel, f64)> = Vec::new();
        for (channel, score) in pairs {
            match entries.iter_mut().find(|(c, _)| *c == channel) {
                Some(entry) => entry.1 = score,
                None => entries.push((channel, score)),
            }
        }
        Self { entries }
    }

    /// Convenience constructor from raw channel names.
    pub fn from_named<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, score)| (Channel::from_name(name), score)),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.entries.iter().map(|(c, _)| c)
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Channel, f64)> {
        self.entries.iter().map(|(c, s)| (c, *s))
    }

    pub fn score(&self, channel: &Channel) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, s)| *s)
    }

    /// Scores laid out in `layout` order, or `None` when the channel sets
    /// differ.
    pub fn scores_in(&self, layout: &[Channel]) -> Option<Vec<f64>> {
        if layout.len() != self.entries.len() {
            return None;
        }
        layout.iter().map(|c| self.score(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("angry", Channel::Angry)]
    #[case("disgust", Channel::Disgust)]
    #[case("fear", Channel::Fear)]
    #[case("happy", Channel::Happy)]
    #[case("sad", Channel::Sad)]
    #[case("surprise", Channel::Surprise)]
    #[case("neutral", Channel::Neutral)]
    #[case("contempt", Channel::Contempt)]
    fn test_from_name_known(#[case] name: &str, #[case] expected: Channel) {
        assert_eq!(Channel::from_name(name), expected);
    }

    #[rstest]
    #[case("fearful")]
    #[case("disgusted")]
    #[case("surprised")]
    #[case("Happy")]
    fn test_other_spellings_keep_raw_name(#[case] name: &str) {
        let c = Channel::from_name(name);
        assert_eq!(c, Channel::Other(name.to_string()));
        assert_eq!(c.name(), name);
        assert_eq!(c.display_name(), name);
    }

    #[test]
    fn test_from_name_unknown_is_preserved() {
        let c = Channel::from_name("bored");
        assert_eq!(c, Channel::Other("bored".to_string()));
        assert_eq!(c.name(), "bored");
    }

    #[rstest]
    #[case(Channel::Angry, "Enojo")]
    #[case(Channel::Disgust, "Asco")]
    #[case(Channel::Fear, "Miedo")]
    #[case(Channel::Happy, "Felicidad")]
    #[case(Channel::Sad, "Tristeza")]
    #[case(Channel::Surprise, "Sorpresa")]
    #[case(Channel::Neutral, "Neutral")]
    #[case(Channel::Contempt, "contempt")]
    #[case(Channel::Other("bored".to_string()), "bored")]
    fn test_display_name_table(#[case] channel: Channel, #[case] expected: &str) {
        assert_eq!(channel.display_name(), expected);
    }

    #[test]
    fn test_preserves_reporting_order() {
        let v = ExpressionVector::from_named([("sad", 0.1), ("happy", 0.7), ("neutral", 0.2)]);
        let names: Vec<_> = v.channels().map(|c| c.name()).collect();
        assert_eq!(names, ["sad", "happy", "neutral"]);
    }

    #[test]
    fn test_duplicate_channel_keeps_first_position_last_score() {
        let v = ExpressionVector::from_named([("happy", 0.1), ("sad", 0.2), ("happy", 0.9)]);
        assert_eq!(v.len(), 2);
        assert_eq!(v.score(&Channel::Happy), Some(0.9));
        assert_eq!(v.channels().next(), Some(&Channel::Happy));
    }

    #[test]
    fn test_scores_in_reorders_by_layout() {
        let v = ExpressionVector::from_named([("sad", 0.8), ("happy", 0.2)]);
        let layout = [Channel::Happy, Channel::Sad];
        assert_eq!(v.scores_in(&layout), Some(vec![0.2, 0.8]));
    }

    #[test]
    fn test_scores_in_rejects_different_channel_set() {
        let v = ExpressionVector::from_named([("sad", 0.8), ("fear", 0.2)]);
        assert_eq!(v.scores_in(&[Channel::Happy, Channel::Sad]), None);
        assert_eq!(v.scores_in(&[Channel::Sad]), None);
    }
}
