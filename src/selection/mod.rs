//! Match selection: Unique > Duplicate > Nothing.
//!
//! Given candidates sorted by adjusted score, prefer the best candidate that
//! was not shown recently, fall back to the overall best one if it is still
//! confident enough, and otherwise select nothing.

mod recency;

pub use recency::{RecencyEntry, RecencyTracker};

use crate::visual::VisualUnit;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A visual unit with its final score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub unit: VisualUnit,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(unit: impl Into<VisualUnit>, score: f32) -> Self {
        Self {
            unit: unit.into(),
            score,
        }
    }
}

/// The unit chosen for one text block.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub unit: VisualUnit,
    pub score: f32,
    /// True when every confident candidate had been shown recently and the
    /// best one was reused anyway.
    pub took_duplicate: bool,
}

/// Threshold-gated selection over a ranked candidate list.
#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy {
    score_threshold: f32,
}

impl SelectionPolicy {
    pub fn new(score_threshold: f32) -> Self {
        Self { score_threshold }
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Pick one candidate and update `tracker` if it is a fresh pick.
    ///
    /// `candidates` must be sorted by descending score: the scan stops at
    /// the first candidate below the threshold.
    pub fn select(
        &self,
        candidates: &[ScoredCandidate],
        tracker: &mut RecencyTracker,
    ) -> Option<Selection> {
        let best = candidates.first()?;

        let mut unique = None;
        for candidate in candidates {
            if candidate.score < self.score_threshold {
                break;
            }
            if !tracker.is_duplicate(&candidate.unit) {
                unique = Some(candidate);
                break;
            }
        }

        if let Some(candidate) = unique {
            debug!(
                video = candidate.unit.video_filename(),
                score = candidate.score,
                "Selected unique candidate"
            );
            tracker.add(&candidate.unit);
            return Some(Selection {
                unit: candidate.unit.clone(),
                score: candidate.score,
                took_duplicate: false,
            });
        }

        if best.score >= self.score_threshold {
            debug!(
                video = best.unit.video_filename(),
                score = best.score,
                "No fresh candidate, reusing best match"
            );
            return Some(Selection {
                unit: best.unit.clone(),
                score: best.score,
                took_duplicate: true,
            });
        }

        debug!(best_score = best.score, "No candidate above threshold");
        None
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::new(0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::VisualFrame;

    fn candidate(name: &str, ts: f64, score: f32) -> ScoredCandidate {
        ScoredCandidate::new(VisualFrame::new(name, ts, "p.jpg").unwrap(), score)
    }

    fn timestamps(tracker: &RecencyTracker) -> Vec<f64> {
        tracker.entries().map(|e| e.timestamp).collect()
    }

    #[test]
    fn test_scenario_a_unique_on_empty_history() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        let candidates = vec![candidate("u1.mp4", 10.0, 0.30), candidate("u2.mp4", 10.0, 0.28)];

        let selection = policy.select(&candidates, &mut tracker).unwrap();
        assert_eq!(selection.unit.video_filename(), "u1.mp4");
        assert!(!selection.took_duplicate);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.entries().next().unwrap().video_filename, "u1.mp4");
    }

    #[test]
    fn test_scenario_b_skips_duplicate() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        tracker.add(&candidate("u1.mp4", 12.0, 1.0).unit);
        let candidates = vec![candidate("u1.mp4", 10.0, 0.30), candidate("u2.mp4", 10.0, 0.28)];

        let selection = policy.select(&candidates, &mut tracker).unwrap();
        assert_eq!(selection.unit.video_filename(), "u2.mp4");
        assert!(!selection.took_duplicate);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_scenario_c_falls_back_to_duplicate() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        tracker.add(&candidate("u1.mp4", 10.0, 1.0).unit);
        let before = timestamps(&tracker);

        let selection = policy
            .select(&[candidate("u1.mp4", 10.0, 0.30)], &mut tracker)
            .unwrap();
        assert_eq!(selection.unit.video_filename(), "u1.mp4");
        assert!(selection.took_duplicate);
        assert_eq!(timestamps(&tracker), before);
    }

    #[test]
    fn test_scenario_d_below_threshold() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        assert!(policy.select(&[candidate("u1.mp4", 1.0, 0.10)], &mut tracker).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_scenario_e_empty_candidates() {
        let policy = SelectionPolicy::new(0.0);
        let mut tracker = RecencyTracker::new(15, 5.0);
        assert!(policy.select(&[], &mut tracker).is_none());
    }

    #[test]
    fn test_scenario_f_history_keeps_last_selections() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        for i in 0..20 {
            let ts = i as f64 * 60.0;
            let selection = policy
                .select(&[candidate("long.mp4", ts, 0.9)], &mut tracker)
                .unwrap();
            assert!(!selection.took_duplicate);
        }

        let expected: Vec<f64> = (5..20).map(|i| i as f64 * 60.0).collect();
        assert_eq!(timestamps(&tracker), expected);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = SelectionPolicy::new(0.25);

        let mut tracker = RecencyTracker::new(15, 5.0);
        let plan_a = policy
            .select(&[candidate("a.mp4", 1.0, 0.25)], &mut tracker)
            .unwrap();
        assert!(!plan_a.took_duplicate);

        // Same unit again is now a duplicate, still exactly at threshold.
        let plan_b = policy
            .select(&[candidate("a.mp4", 1.0, 0.25)], &mut tracker)
            .unwrap();
        assert!(plan_b.took_duplicate);
    }

    #[test]
    fn test_scan_stops_at_first_sub_threshold_candidate() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        tracker.add(&candidate("a.mp4", 1.0, 1.0).unit);

        // Unsorted input: the fresh candidate after the low one is never reached.
        let candidates = vec![
            candidate("a.mp4", 1.0, 0.5),
            candidate("b.mp4", 1.0, 0.1),
            candidate("c.mp4", 1.0, 0.9),
        ];
        let selection = policy.select(&candidates, &mut tracker).unwrap();
        assert_eq!(selection.unit.video_filename(), "a.mp4");
        assert!(selection.took_duplicate);
    }

    #[test]
    fn test_fresh_candidate_below_threshold_loses_to_confident_repeat() {
        let policy = SelectionPolicy::new(0.25);
        let mut tracker = RecencyTracker::new(15, 5.0);
        tracker.add(&candidate("a.mp4", 1.0, 1.0).unit);

        let candidates = vec![candidate("a.mp4", 1.0, 0.6), candidate("b.mp4", 1.0, 0.2)];
        let selection = policy.select(&candidates, &mut tracker).unwrap();
        assert_eq!(selection.unit.video_filename(), "a.mp4");
        assert!(selection.took_duplicate);
        assert_eq!(tracker.len(), 1);
    }
}
