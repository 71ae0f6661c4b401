//! Review command - approve or reject matches one by one.

use crate::analysis::{load_records, MatchRecord};
use crate::cli::Output;
use crate::config::Settings;
use crate::feedback::{FeedbackLabel, FeedbackStore, ScoreAdjuster};
use anyhow::Result;
use console::{style, Term};
use std::path::Path;

/// What the user decided for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    Skip,
    Quit,
}

impl ReviewDecision {
    fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'y' | '+' => Some(Self::Approve),
            'n' | '-' => Some(Self::Reject),
            's' | ' ' => Some(Self::Skip),
            'q' => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Counts of a review session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub approved: usize,
    pub rejected: usize,
    pub skipped: usize,
    /// Decisions that could not be written to the feedback file.
    pub unsaved: usize,
}

/// Run the review command.
pub fn run_review(results: &Path, settings: Settings) -> Result<()> {
    let records = load_records(results)?;
    if records.is_empty() {
        Output::info("The results file contains no matches.");
        return Ok(());
    }

    let feedback = FeedbackStore::load(&settings.feedback_path(), ScoreAdjuster::from(&settings.scoring));
    review_interactively(&records, &feedback)
}

/// Review `records` on the terminal.
pub fn review_interactively(records: &[MatchRecord], feedback: &FeedbackStore) -> Result<()> {
    let term = Term::stdout();
    Output::header("Review");
    println!(
        "  {} approve  {} reject  {} skip  {} quit",
        style("y").green().bold(),
        style("n").red().bold(),
        style("s").dim(),
        style("q").dim()
    );

    let summary = review_records(records, feedback, |record| {
        Output::match_record(record);
        if let Some(label) = feedback.label(&record.feedback_key) {
            println!("   {}", style(format!("previously marked {}", label)).dim());
        }
        loop {
            let key = term.read_char()?;
            if let Some(decision) = ReviewDecision::from_key(key) {
                return Ok(decision);
            }
        }
    })?;

    println!();
    Output::success(&format!(
        "Approved {}, rejected {}, skipped {}",
        summary.approved, summary.rejected, summary.skipped
    ));
    if summary.unsaved > 0 {
        let target = feedback
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "the feedback file".to_string());
        Output::warning(&format!(
            "{} decision(s) could not be saved to {} and will be lost on exit.",
            summary.unsaved, target
        ));
    }
    Ok(())
}

/// Apply one decision per record until the records run out or the user quits.
pub fn review_records<F>(
    records: &[MatchRecord],
    feedback: &FeedbackStore,
    mut decide: F,
) -> Result<ReviewSummary>
where
    F: FnMut(&MatchRecord) -> std::io::Result<ReviewDecision>,
{
    let mut summary = ReviewSummary::default();
    for record in records {
        let label = match decide(record)? {
            ReviewDecision::Approve => {
                summary.approved += 1;
                FeedbackLabel::Positive
            }
            ReviewDecision::Reject => {
                summary.rejected += 1;
                FeedbackLabel::Negative
            }
            ReviewDecision::Skip => {
                summary.skipped += 1;
                continue;
            }
            ReviewDecision::Quit => break,
        };
        if !feedback.record_key(record.feedback_key.clone(), label).persisted {
            summary.unsaved += 1;
        }
    }
    Ok(summary)
}
