//! Configuration settings for reelmatch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub selection: SelectionSettings,
    pub scoring: ScoringSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub feedback: FeedbackSettings,
    pub document: DocumentSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.reelmatch".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Match selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Minimum adjusted score a candidate needs to be selected at all.
    pub score_threshold: f32,
    /// Maximum number of recently used units remembered during a run.
    pub history_size: usize,
    /// Two units of the same video closer than this (seconds) are duplicates.
    pub time_window: f64,
    /// Number of candidates requested from the search per block.
    pub search_limit: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            history_size: 15,
            time_window: 5.0,
            search_limit: 12,
        }
    }
}

/// Query-time scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Weight of the full-text sub-query similarity.
    pub text_weight: f32,
    /// Weight of the tag sub-query similarity.
    pub tag_weight: f32,
    /// Multiplier applied to candidates only found by the tag sub-query.
    pub tag_only_penalty: f32,
    /// Multiplier for units the user rejected.
    pub negative_multiplier: f32,
    /// Multiplier for units the user approved.
    pub positive_multiplier: f32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            text_weight: 0.7,
            tag_weight: 0.3,
            tag_only_penalty: 0.8,
            negative_multiplier: 0.2,
            positive_multiplier: 1.25,
        }
    }
}

/// Embedding server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of the multimodal embedding server.
    pub endpoint: String,
    /// Model name sent along with every request.
    pub model: String,
    /// Number of inputs per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8765".to_string(),
            model: "clip-ViT-B-32-multilingual-v1".to_string(),
            batch_size: 32,
        }
    }
}

/// Visual index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Path to the SQLite index database.
    pub sqlite_path: String,
    /// Directory holding extracted preview frames.
    pub frames_dir: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.reelmatch/visual_index.db".to_string(),
            frames_dir: "~/.reelmatch/frames".to_string(),
        }
    }
}

/// Feedback persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Path to the feedback JSON file.
    pub path: String,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            path: "~/.reelmatch/feedback.json".to_string(),
        }
    }
}

/// Script document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Paragraphs shorter than this are not treated as blocks.
    pub min_block_chars: usize,
    /// Paragraphs containing any of these (case-insensitive) are skipped.
    pub ignored_keywords: Vec<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            min_block_chars: 20,
            ignored_keywords: [
                "Рыба",
                "Контрасты",
                "Ссылка",
                "Insert",
                "Тизер",
                "http",
                "Стендап",
                "Закадр",
                "Глава",
                "Теги от редактора",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the selection engine cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ReelError;

        let threshold = self.selection.score_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ReelError::Config(format!(
                "selection.score_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.selection.history_size == 0 {
            return Err(ReelError::Config(
                "selection.history_size must be at least 1".to_string(),
            ));
        }
        if self.selection.search_limit == 0 {
            return Err(ReelError::Config(
                "selection.search_limit must be at least 1".to_string(),
            ));
        }
        if !(self.selection.time_window >= 0.0) {
            return Err(ReelError::Config(format!(
                "selection.time_window must be a non-negative number, got {}",
                self.selection.time_window
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(ReelError::Config(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelmatch")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite index path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.index.sqlite_path)
    }

    /// Get the expanded frames directory path.
    pub fn frames_dir(&self) -> PathBuf {
        Self::expand_path(&self.index.frames_dir)
    }

    /// Get the expanded feedback file path.
    pub fn feedback_path(&self) -> PathBuf {
        Self::expand_path(&self.feedback.path)
    }
}
