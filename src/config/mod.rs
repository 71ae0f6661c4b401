//! Configuration module for reelmatch.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    DocumentSettings, EmbeddingSettings, FeedbackSettings, GeneralSettings, IndexSettings,
    ScoringSettings, SelectionSettings, Settings,
};
