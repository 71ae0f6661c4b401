//! Embedding-based candidate search over the visual index.

use super::merge::{HitAggregator, HitSource, ScoreWeights};
use super::{tags, CandidateSearch};
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::Result;
use crate::feedback::{FeedbackKey, FeedbackStore};
use crate::index::{IndexedFrame, IndexedSegment, VisualIndex};
use crate::selection::ScoredCandidate;
use crate::visual::VisualUnit;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Query vectors for the two sub-queries.
struct QueryVectors {
    text: Option<Vec<f32>>,
    tags: Option<Vec<f32>>,
}

/// Search engine holding the whole index in memory.
///
/// Built once with [`EmbeddingSearch::open`]; queries never touch the
/// database afterwards.
pub struct EmbeddingSearch {
    embedder: Arc<dyn Embedder>,
    feedback: Arc<FeedbackStore>,
    weights: ScoreWeights,
    frames: Vec<IndexedFrame>,
    segments: Vec<IndexedSegment>,
}

impl EmbeddingSearch {
    /// Load every frame and segment from `index`.
    #[instrument(skip_all)]
    pub async fn open(
        index: &dyn VisualIndex,
        embedder: Arc<dyn Embedder>,
        feedback: Arc<FeedbackStore>,
        weights: ScoreWeights,
    ) -> Result<Self> {
        let frames = index.load_frames().await?;
        let segments = index.load_segments().await?;
        info!(
            "Search ready with {} frames and {} segments",
            frames.len(),
            segments.len()
        );
        Ok(Self::from_parts(frames, segments, embedder, feedback, weights))
    }

    /// Build from already loaded index entries.
    pub fn from_parts(
        frames: Vec<IndexedFrame>,
        segments: Vec<IndexedSegment>,
        embedder: Arc<dyn Embedder>,
        feedback: Arc<FeedbackStore>,
        weights: ScoreWeights,
    ) -> Self {
        Self {
            embedder,
            feedback,
            weights,
            frames,
            segments,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn feedback(&self) -> &Arc<FeedbackStore> {
        &self.feedback
    }

    async fn embed_query(&self, query: &str) -> Result<QueryVectors> {
        let tag_query = tags::tag_query(query);

        let text_future = async {
            if query.is_empty() {
                Ok(None)
            } else {
                self.embedder.embed(query).await.map(Some)
            }
        };
        let tags_future = async {
            if tag_query.is_empty() {
                Ok(None)
            } else {
                self.embedder.embed(&tag_query).await.map(Some)
            }
        };

        let (text, tags) = futures::try_join!(text_future, tags_future)?;
        Ok(QueryVectors { text, tags })
    }

    /// Run both sub-queries over `corpus` and rank the merged hits.
    fn rank<F>(
        &self,
        vectors: &QueryVectors,
        corpus: &[&[f32]],
        key_of: F,
        limit: usize,
    ) -> Vec<(usize, f32)>
    where
        F: Fn(usize) -> FeedbackKey,
    {
        let mut aggregator = HitAggregator::new();
        if let Some(text) = &vectors.text {
            let hits = top_k(text, corpus, (limit * 3).max(15));
            aggregator.merge(&hits, HitSource::Text);
        }
        if let Some(tags) = &vectors.tags {
            let hits = top_k(tags, corpus, (limit * 2).max(10));
            aggregator.merge(&hits, HitSource::Tags);
        }
        aggregator.rank(&self.weights, &self.feedback, key_of, limit)
    }
}

/// The `k` most similar corpus entries as `(index, cosine similarity)`.
fn top_k(query: &[f32], corpus: &[&[f32]], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(idx, embedding)| (idx, cosine_similarity(query, embedding)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

#[async_trait]
impl CandidateSearch for EmbeddingSearch {
    #[instrument(skip(self, query))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredCandidate>> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embed_query(query.trim()).await?;
        let corpus: Vec<&[f32]> = self.frames.iter().map(|f| f.embedding.as_slice()).collect();
        let ranked = self.rank(
            &vectors,
            &corpus,
            |idx| {
                let frame = &self.frames[idx].frame;
                FeedbackKey::new(&frame.video_filename, frame.timestamp)
            },
            limit,
        );

        debug!("Frame search returned {} candidates", ranked.len());
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredCandidate {
                unit: VisualUnit::Frame(self.frames[idx].frame.clone()),
                score,
            })
            .collect())
    }

    #[instrument(skip(self, query))]
    async fn search_segments(&self, query: &str, limit: usize) -> Result<Vec<ScoredCandidate>> {
        if self.segments.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embed_query(query.trim()).await?;
        let corpus: Vec<&[f32]> = self.segments.iter().map(|s| s.embedding.as_slice()).collect();
        let units: Vec<VisualUnit> = self
            .segments
            .iter()
            .map(|s| VisualUnit::Segment(s.segment.clone()))
            .collect();
        let ranked = self.rank(&vectors, &corpus, |idx| FeedbackKey::for_unit(&units[idx]), limit);

        debug!("Segment search returned {} candidates", ranked.len());
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| ScoredCandidate {
                unit: units[idx].clone(),
                score,
            })
            .collect())
    }

    fn is_ready(&self) -> bool {
        !self.frames.is_empty() || !self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::ScoreAdjuster;
    use crate::index::MemoryVisualIndex;
    use crate::visual::{VideoSegment, VisualFrame};
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Embeds known strings to fixed vectors; everything else maps to zero.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.table.get(text).cloned().unwrap_or_else(|| vec![0.0, 0.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>> {
            Ok(paths.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn model(&self) -> &str {
            "table"
        }
    }

    fn embedder(entries: &[(&str, [f32; 3])]) -> Arc<dyn Embedder> {
        Arc::new(TableEmbedder {
            table: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
        })
    }

    fn frame(name: &str, ts: f64, embedding: [f32; 3]) -> IndexedFrame {
        IndexedFrame::new(
            VisualFrame::new(name, ts, format!("/f/{}_{}.jpg", name, ts)).unwrap(),
            embedding.to_vec(),
        )
    }

    fn feedback() -> Arc<FeedbackStore> {
        Arc::new(FeedbackStore::in_memory(ScoreAdjuster::default()))
    }

    #[tokio::test]
    async fn test_text_and_tag_scores_combine() {
        // "sunset beach" has tag phrase "sunset, beach, sunset beach".
        let embedder = embedder(&[
            ("sunset beach", [1.0, 0.0, 0.0]),
            ("sunset, beach, sunset beach", [0.0, 1.0, 0.0]),
        ]);
        let search = EmbeddingSearch::from_parts(
            vec![
                frame("text.mp4", 1.0, [1.0, 0.0, 0.0]),
                frame("tags.mp4", 1.0, [0.0, 1.0, 0.0]),
            ],
            vec![],
            embedder,
            feedback(),
            ScoreWeights::default(),
        );

        let results = search.search("  sunset beach ", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].unit.video_filename(), "text.mp4");
        assert!((results[0].score - 0.7).abs() < 1e-5);
        assert_eq!(results[1].unit.video_filename(), "tags.mp4");
        assert!((results[1].score - 0.3).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_negative_feedback_demotes() {
        let embedder = embedder(&[("ocean", [1.0, 0.0, 0.0])]);
        let feedback = feedback();
        let search = EmbeddingSearch::from_parts(
            vec![
                frame("best.mp4", 3.0, [1.0, 0.0, 0.0]),
                frame("good.mp4", 3.0, [0.9, 0.1, 0.0]),
            ],
            vec![],
            embedder,
            feedback.clone(),
            ScoreWeights::default(),
        );

        let before = search.search("ocean", 5).await.unwrap();
        assert_eq!(before[0].unit.video_filename(), "best.mp4");

        feedback.record(&before[0].unit, false);
        let after = search.search("ocean", 5).await.unwrap();
        assert_eq!(after[0].unit.video_filename(), "good.mp4");
    }

    #[tokio::test]
    async fn test_segments_and_readiness() {
        let index = MemoryVisualIndex::new();
        let empty = EmbeddingSearch::open(&index, embedder(&[]), feedback(), ScoreWeights::default())
            .await
            .unwrap();
        assert!(!empty.is_ready());
        assert!(empty.search("anything", 5).await.unwrap().is_empty());

        index
            .upsert_segments(&[IndexedSegment::new(
                VideoSegment {
                    video_filename: "s.mp4".to_string(),
                    start_time: 0.0,
                    end_time: 10.0,
                    segment_id: "s-0".to_string(),
                    preview_frame_path: "/f/s.jpg".to_string(),
                    key_frames: vec![],
                },
                vec![1.0, 0.0, 0.0],
            )])
            .await
            .unwrap();

        let search = EmbeddingSearch::open(
            &index,
            embedder(&[("forest", [1.0, 0.0, 0.0])]),
            feedback(),
            ScoreWeights::default(),
        )
        .await
        .unwrap();
        assert!(search.is_ready());
        assert!(search.search("forest", 5).await.unwrap().is_empty());

        let segments = search.search_segments("forest", 5).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].unit.time_range(), Some((0.0, 10.0)));
    }

    #[test]
    fn test_top_k() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let corpus: Vec<&[f32]> = vec![&b, &a];
        let hits = top_k(&[1.0, 0.0], &corpus, 1);
        assert_eq!(hits, vec![(1, 1.0)]);
    }
}
