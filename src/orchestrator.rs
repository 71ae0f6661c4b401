//! Component wiring for reelmatch.
//!
//! Builds the visual index, embedder, feedback store and search engine from
//! [`Settings`] and hands out the services built on top of them.

use crate::analysis::DocumentAnalyzer;
use crate::config::Settings;
use crate::document::{BlockFilter, TextFileSource};
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::Result;
use crate::feedback::{FeedbackStore, ScoreAdjuster};
use crate::index::{Importer, SqliteVisualIndex, VisualIndex};
use crate::search::{EmbeddingSearch, ScoreWeights};
use crate::storage::StorageService;
use std::sync::Arc;
use tracing::info;

/// Owns the long-lived components of a reelmatch session.
pub struct Orchestrator {
    settings: Settings,
    index: Arc<dyn VisualIndex>,
    embedder: Arc<dyn Embedder>,
    feedback: Arc<FeedbackStore>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the configured SQLite index and
    /// embedding server.
    pub fn new(settings: Settings) -> Result<Self> {
        std::fs::create_dir_all(settings.data_dir())?;
        std::fs::create_dir_all(settings.frames_dir())?;

        let index: Arc<dyn VisualIndex> = Arc::new(SqliteVisualIndex::new(&settings.sqlite_path())?);
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_settings(&settings.embedding)?);
        let feedback = Arc::new(FeedbackStore::load(
            &settings.feedback_path(),
            ScoreAdjuster::from(&settings.scoring),
        ));

        info!("Using embedding model {}", embedder.model());
        Ok(Self::with_components(settings, index, embedder, feedback))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        index: Arc<dyn VisualIndex>,
        embedder: Arc<dyn Embedder>,
        feedback: Arc<FeedbackStore>,
    ) -> Self {
        Self {
            settings,
            index,
            embedder,
            feedback,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> Arc<dyn VisualIndex> {
        self.index.clone()
    }

    pub fn feedback(&self) -> Arc<FeedbackStore> {
        self.feedback.clone()
    }

    /// Load the index into a search engine.
    pub async fn open_search(&self) -> Result<Arc<EmbeddingSearch>> {
        let search = EmbeddingSearch::open(
            self.index.as_ref(),
            self.embedder.clone(),
            self.feedback.clone(),
            ScoreWeights::from(&self.settings.scoring),
        )
        .await?;
        Ok(Arc::new(search))
    }

    /// Open the search engine and build an analyzer on it.
    pub async fn analyzer(&self) -> Result<DocumentAnalyzer> {
        let search = self.open_search().await?;
        Ok(DocumentAnalyzer::new(
            search,
            self.feedback.clone(),
            &self.settings.selection,
        ))
    }

    /// A plain-text document source using the configured block filter.
    pub fn document_source(&self) -> TextFileSource {
        TextFileSource::new(BlockFilter::from(&self.settings.document))
    }

    pub fn importer(&self) -> Importer {
        Importer::new(
            self.index.clone(),
            self.embedder.clone(),
            self.settings.embedding.batch_size,
        )
    }

    pub fn storage(&self) -> StorageService {
        StorageService::from_settings(&self.settings)
    }
}
