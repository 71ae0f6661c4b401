//! Feedback-based score adjustment.

use super::FeedbackLabel;
use crate::config::ScoringSettings;

/// Multipliers applied to a raw similarity score depending on feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreAdjuster {
    pub negative_multiplier: f32,
    pub positive_multiplier: f32,
}

impl Default for ScoreAdjuster {
    fn default() -> Self {
        Self {
            negative_multiplier: 0.2,
            positive_multiplier: 1.25,
        }
    }
}

impl From<&ScoringSettings> for ScoreAdjuster {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            negative_multiplier: settings.negative_multiplier,
            positive_multiplier: settings.positive_multiplier,
        }
    }
}

impl ScoreAdjuster {
    /// Apply the multiplier for `label` and clamp into [0, 1].
    pub fn adjust(&self, raw_score: f32, label: Option<FeedbackLabel>) -> f32 {
        let score = match label {
            Some(FeedbackLabel::Negative) => raw_score * self.negative_multiplier,
            Some(FeedbackLabel::Positive) => raw_score * self.positive_multiplier,
            None => raw_score,
        };
        clamp_unit(score)
    }
}

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp_unit(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
