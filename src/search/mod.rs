//! Candidate search: ranked visual units for a text query.
//!
//! Each query runs two sub-queries against the visual index (the full text
//! and its extracted tags), merges the hits, and applies feedback before
//! handing the ranked list to the selection policy.

mod engine;
mod merge;
pub mod tags;

pub use engine::EmbeddingSearch;
pub use merge::{HitAggregator, HitSource, ScoreWeights};
pub use tags::{extract_tags, tag_query};

use crate::error::Result;
use crate::selection::ScoredCandidate;
use async_trait::async_trait;

/// Trait for a text-to-footage similarity search.
///
/// Results are sorted by descending score, scores are within [0, 1].
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    /// Search individual frames.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredCandidate>>;

    /// Search segments. Returns an empty list when no segments are indexed.
    async fn search_segments(&self, query: &str, limit: usize) -> Result<Vec<ScoredCandidate>>;

    /// Whether anything is indexed.
    fn is_ready(&self) -> bool;

    /// Tags shown next to a match for `text`.
    fn extract_tags(&self, text: &str) -> Vec<String> {
        tags::extract_tags(text)
    }
}
