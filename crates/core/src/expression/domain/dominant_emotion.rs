use super::expression_vector::Channel;

/// Channel with the highest smoothed score, and that score as a percentage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DominantEmotion {
    pub channel: Channel,
    pub confidence_percent: u8,
}

impl DominantEmotion {
    /// Picks the first channel holding the maximum average. Later channels
    /// with an equal score do not replace it.
    ///
    /// Returns `None` for an empty channel set.
    pub fn from_averages(layout: &[Channel], averages: &[f64]) -> Option<Self> {
        let mut best: Option<usize> = None;
        for (i, &avg) in averages.iter().enumerate().take(layout.len()) {
            let replaces = match best {
                None => true,
                Some(b) => avg > averages[b] || (averages[b].is_nan() && !avg.is_nan()),
            };
            if replaces {
                best = Some(i);
            }
        }
        let index = best?;
        Some(Self {
            channel: layout[index].clone(),
            confidence_percent: to_percent(averages[index]),
        })
    }

    pub fn label(&self) -> &str {
        self.channel.display_name()
    }
}

fn to_percent(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}
