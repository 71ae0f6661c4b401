//! Merging of text and tag sub-query hits into one ranked list.

use crate::config::ScoringSettings;
use crate::feedback::{clamp_unit, FeedbackKey, FeedbackStore};
use std::collections::HashMap;

/// Which sub-query produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitSource {
    /// The full block text.
    Text,
    /// The extracted tag phrase.
    Tags,
}

/// Weights for combining sub-query similarities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub text: f32,
    pub tags: f32,
    /// Multiplier for candidates the text sub-query did not return.
    pub tag_only_penalty: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            text: 0.7,
            tags: 0.3,
            tag_only_penalty: 0.8,
        }
    }
}

impl From<&ScoringSettings> for ScoreWeights {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            text: settings.text_weight,
            tags: settings.tag_weight,
            tag_only_penalty: settings.tag_only_penalty,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SourceScores {
    text: Option<f32>,
    tags: Option<f32>,
}

/// Accumulates hits per candidate index, keeping the best similarity per source.
#[derive(Debug, Default)]
pub struct HitAggregator {
    hits: HashMap<usize, SourceScores>,
}

impl HitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hits `(candidate index, similarity)` from one sub-query.
    pub fn merge(&mut self, hits: &[(usize, f32)], source: HitSource) {
        for &(idx, score) in hits {
            let entry = self.hits.entry(idx).or_default();
            let slot = match source {
                HitSource::Text => &mut entry.text,
                HitSource::Tags => &mut entry.tags,
            };
            *slot = Some(slot.map_or(score, |prev| prev.max(score)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Weighted combination per candidate, before feedback.
    pub fn combined(&self, weights: &ScoreWeights) -> Vec<(usize, f32)> {
        self.hits
            .iter()
            .map(|(&idx, scores)| {
                let mut combined = weights.text * scores.text.unwrap_or(0.0)
                    + weights.tags * scores.tags.unwrap_or(0.0);
                if scores.text.is_none() {
                    combined *= weights.tag_only_penalty;
                }
                (idx, combined)
            })
            .collect()
    }

    /// Combine, apply feedback, clamp, sort descending and truncate.
    ///
    /// `key_of` maps a candidate index to its feedback key.
    pub fn rank<F>(
        &self,
        weights: &ScoreWeights,
        feedback: &FeedbackStore,
        key_of: F,
        limit: usize,
    ) -> Vec<(usize, f32)>
    where
        F: Fn(usize) -> FeedbackKey,
    {
        let mut ranked: Vec<(usize, f32)> = self
            .combined(weights)
            .into_iter()
            .map(|(idx, score)| (idx, clamp_unit(feedback.adjust(score, &key_of(idx)))))
            .collect();

        // Ties broken by index so the order is deterministic.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackLabel, ScoreAdjuster};

    fn key(idx: usize) -> FeedbackKey {
        FeedbackKey::new("v.mp4", idx as f64)
    }

    #[test]
    fn test_max_per_source_and_weighted_sum() {
        let mut agg = HitAggregator::new();
        agg.merge(&[(0, 0.5), (0, 0.6)], HitSource::Text);
        agg.merge(&[(0, 0.2)], HitSource::Tags);

        let combined = agg.combined(&ScoreWeights::default());
        assert_eq!(combined.len(), 1);
        assert!((combined[0].1 - (0.7 * 0.6 + 0.3 * 0.2)).abs() < 1e-6);
    }

    #[test]
    fn test_tag_only_penalty() {
        let mut agg = HitAggregator::new();
        agg.merge(&[(3, 0.5)], HitSource::Tags);

        let combined = agg.combined(&ScoreWeights::default());
        assert!((combined[0].1 - 0.3 * 0.5 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_rank_applies_feedback_and_sorts() {
        let feedback = FeedbackStore::in_memory(ScoreAdjuster::default());
        feedback.record_key(key(0), FeedbackLabel::Negative);
        feedback.record_key(key(2), FeedbackLabel::Positive);

        let mut agg = HitAggregator::new();
        agg.merge(&[(0, 0.9), (1, 0.5), (2, 0.45)], HitSource::Text);

        let ranked = agg.rank(&ScoreWeights::default(), &feedback, key, 10);
        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(ranked.iter().all(|(_, s)| (0.0..=1.0).contains(s)));

        let top = agg.rank(&ScoreWeights::default(), &feedback, key, 1);
        assert_eq!(top.len(), 1);
    }
}
