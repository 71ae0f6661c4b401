//! Feedback command implementation.

use crate::cli::{FeedbackAction, Output};
use crate::config::Settings;
use crate::feedback::{FeedbackKey, FeedbackLabel, FeedbackStore, ScoreAdjuster};
use anyhow::{bail, Result};

/// Run the feedback command.
pub fn run_feedback(action: &FeedbackAction, settings: Settings) -> Result<()> {
    let store = FeedbackStore::load(&settings.feedback_path(), ScoreAdjuster::from(&settings.scoring));

    match action {
        FeedbackAction::Like { video, timestamp } => {
            record(&store, video, *timestamp, FeedbackLabel::Positive)?;
        }

        FeedbackAction::Dislike { video, timestamp } => {
            record(&store, video, *timestamp, FeedbackLabel::Negative)?;
        }

        FeedbackAction::Clear { video, timestamp } => {
            let key = key(video, *timestamp)?;
            let outcome = store.clear(&key);
            if !outcome.removed {
                Output::info(&format!("No feedback recorded for {}", key));
            } else if outcome.persisted {
                Output::success(&format!("Cleared feedback for {}", key));
            } else {
                bail!("Failed to save feedback after clearing {}", key);
            }
        }

        FeedbackAction::Show => {
            let snapshot = store.snapshot();
            if snapshot.positive.is_empty() && snapshot.negative.is_empty() {
                Output::info("No feedback recorded yet. Use 'reelmatch review <results.json>' to add some.");
                return Ok(());
            }

            Output::header(&format!("Liked ({})", snapshot.positive.len()));
            for key in &snapshot.positive {
                Output::list_item(key.as_str());
            }
            Output::header(&format!("Disliked ({})", snapshot.negative.len()));
            for key in &snapshot.negative {
                Output::list_item(key.as_str());
            }
        }
    }

    Ok(())
}

fn key(video: &str, timestamp: f64) -> Result<FeedbackKey> {
    if video.is_empty() || !(timestamp >= 0.0) {
        bail!("Expected a video file name and a non-negative timestamp");
    }
    Ok(FeedbackKey::new(video, timestamp))
}

fn record(store: &FeedbackStore, video: &str, timestamp: f64, label: FeedbackLabel) -> Result<()> {
    let outcome = store.record_key(key(video, timestamp)?, label);
    if outcome.persisted {
        Output::success(&format!("Marked {} as {}", outcome.key, outcome.label));
        Ok(())
    } else {
        bail!("Failed to save feedback for {}", outcome.key)
    }
}
