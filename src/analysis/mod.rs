//! Block processing loop.
//!
//! Walks a script block by block, searches footage for each block, picks one
//! unit per block with the selection policy and reports progress as events.

mod record;

pub use record::{load_records, save_records, snippet, MatchRecord};

use crate::config::SelectionSettings;
use crate::document::{DocumentSource, ScenarioBlock};
use crate::error::{ReelError, Result};
use crate::feedback::{FeedbackLabel, FeedbackOutcome, FeedbackStore};
use crate::search::CandidateSearch;
use crate::selection::{RecencyTracker, SelectionPolicy};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, instrument};

/// Progress of an analysis run.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// Block `index` (1-based) of `total` is being processed.
    Progress { index: usize, total: usize },
    ResultFound(MatchRecord),
    BlockFailed {
        index: usize,
        block_id: String,
        error: String,
    },
    /// Always the last event of a run that got past its preconditions.
    Finished {
        matched: usize,
        failed: usize,
        total: usize,
    },
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub records: Vec<MatchRecord>,
    pub total_blocks: usize,
    pub failed_blocks: usize,
}

impl AnalysisReport {
    pub fn unmatched_blocks(&self) -> usize {
        self.total_blocks - self.records.len() - self.failed_blocks
    }
}

/// Matches every block of a document to footage.
pub struct DocumentAnalyzer {
    search: Arc<dyn CandidateSearch>,
    feedback: Arc<FeedbackStore>,
    policy: SelectionPolicy,
    history_size: usize,
    time_window: f64,
    search_limit: usize,
}

impl DocumentAnalyzer {
    pub fn new(
        search: Arc<dyn CandidateSearch>,
        feedback: Arc<FeedbackStore>,
        settings: &SelectionSettings,
    ) -> Self {
        Self {
            search,
            feedback,
            policy: SelectionPolicy::new(settings.score_threshold),
            history_size: settings.history_size,
            time_window: settings.time_window,
            search_limit: settings.search_limit,
        }
    }

    /// Override the score threshold.
    pub fn with_threshold(mut self, score_threshold: f32) -> Self {
        self.policy = SelectionPolicy::new(score_threshold);
        self
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Analyze the document behind `resource`.
    ///
    /// Fails before any block is touched if nothing is indexed or the document
    /// cannot be opened. Once blocks are processed, a failing block is reported
    /// as [`AnalysisEvent::BlockFailed`] and the run goes on.
    #[instrument(skip(self, source, events))]
    pub async fn analyze(
        &self,
        source: &mut dyn DocumentSource,
        resource: &str,
        events: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisReport> {
        if !self.search.is_ready() {
            return Err(ReelError::NotReady(
                "the visual index is empty, import footage first".to_string(),
            ));
        }
        if !source.is_connected() {
            source.connect(resource)?;
        }

        let blocks = source.extract_blocks()?;
        let total = blocks.len();
        info!("Processing {} blocks", total);

        // History only lives for one run.
        let mut tracker = RecencyTracker::new(self.history_size, self.time_window);
        let mut report = AnalysisReport {
            total_blocks: total,
            ..Default::default()
        };

        for (idx, block) in blocks.iter().enumerate() {
            let index = idx + 1;
            emit(events, AnalysisEvent::Progress { index, total });

            match self.process_block(block, &mut tracker).await {
                Ok(Some(record)) => {
                    emit(events, AnalysisEvent::ResultFound(record.clone()));
                    report.records.push(record);
                }
                Ok(None) => debug!(block = %block.block_id, "No footage fits"),
                Err(e) => {
                    error!(block = %block.block_id, index, "Block failed: {}", e);
                    report.failed_blocks += 1;
                    emit(
                        events,
                        AnalysisEvent::BlockFailed {
                            index,
                            block_id: block.block_id.clone(),
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        info!(
            "Analysis finished: {} matched, {} failed, {} total",
            report.records.len(),
            report.failed_blocks,
            total
        );
        emit(
            events,
            AnalysisEvent::Finished {
                matched: report.records.len(),
                failed: report.failed_blocks,
                total,
            },
        );

        Ok(report)
    }

    /// Search, select and build the record for one block.
    async fn process_block(
        &self,
        block: &ScenarioBlock,
        tracker: &mut RecencyTracker,
    ) -> Result<Option<MatchRecord>> {
        let mut candidates = self
            .search
            .search_segments(&block.text, self.search_limit)
            .await?;
        if candidates.is_empty() {
            candidates = self.search.search(&block.text, self.search_limit).await?;
        }
        if candidates.is_empty() {
            debug!(block = %block.block_id, "Search returned nothing");
            return Ok(None);
        }

        let Some(selection) = self.policy.select(&candidates, tracker) else {
            return Ok(None);
        };

        let tags = self.search.extract_tags(&block.text);
        Ok(Some(MatchRecord::from_selection(block, &selection, tags)))
    }

    /// Record a like or dislike for the footage of a match.
    pub fn record_feedback(&self, record: &MatchRecord, positive: bool) -> FeedbackOutcome {
        self.feedback
            .record_key(record.feedback_key.clone(), FeedbackLabel::from_positive(positive))
    }
}

/// Send an event; a closed receiver is not an error for the run.
fn emit(events: &UnboundedSender<AnalysisEvent>, event: AnalysisEvent) {
    if events.send(event).is_err() {
        debug!("Event receiver dropped");
    }
}
