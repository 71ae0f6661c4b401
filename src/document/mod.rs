//! Script document sources.
//!
//! A document is read as a sequence of text blocks; each block is matched to
//! one piece of footage.

mod text_file;

pub use text_file::TextFileSource;

use crate::config::DocumentSettings;
use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};

/// One block of script text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBlock {
    pub text: String,
    pub block_id: String,
}

impl ScenarioBlock {
    /// Create a validated block.
    pub fn new(text: impl Into<String>, block_id: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let block_id = block_id.into();
        if text.trim().is_empty() {
            return Err(ReelError::Document("Block text cannot be empty".to_string()));
        }
        if block_id.is_empty() {
            return Err(ReelError::Document("Block id cannot be empty".to_string()));
        }
        Ok(Self { text, block_id })
    }
}

/// Trait for document sources.
pub trait DocumentSource: Send {
    /// Open the document identified by `resource`.
    fn connect(&mut self, resource: &str) -> Result<()>;

    /// Whether a document is open.
    fn is_connected(&self) -> bool;

    /// All blocks of the open document, in document order.
    fn extract_blocks(&self) -> Result<Vec<ScenarioBlock>>;
}

/// Filter deciding which paragraphs become blocks.
#[derive(Debug, Clone)]
pub struct BlockFilter {
    min_chars: usize,
    /// Lowercased.
    ignored_keywords: Vec<String>,
}

impl BlockFilter {
    pub fn new(min_chars: usize, ignored_keywords: &[String]) -> Self {
        Self {
            min_chars,
            ignored_keywords: ignored_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// A paragraph qualifies if it is long enough and carries no editorial marker.
    pub fn accepts(&self, text: &str) -> bool {
        if text.chars().count() < self.min_chars {
            return false;
        }
        let lowered = text.to_lowercase();
        !self
            .ignored_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }
}

impl From<&DocumentSettings> for BlockFilter {
    fn from(settings: &DocumentSettings) -> Self {
        Self::new(settings.min_block_chars, &settings.ignored_keywords)
    }
}

impl Default for BlockFilter {
    fn default() -> Self {
        Self::from(&DocumentSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_validation() {
        assert!(ScenarioBlock::new("some text", "p1").is_ok());
        assert!(ScenarioBlock::new("   ", "p1").is_err());
        assert!(ScenarioBlock::new("text", "").is_err());
    }

    #[test]
    fn test_filter() {
        let filter = BlockFilter::default();
        assert!(filter.accepts("The camera slowly pans over the valley."));
        assert!(!filter.accepts("Too short"));
        assert!(!filter.accepts("See the source at https://example.com for details"));
        assert!(!filter.accepts("ЗАКАДР: голос за кадром рассказывает историю"));
    }
}
