//! Plain-text script source.
//!
//! Paragraphs are separated by blank lines. Exported Google Docs, markdown
//! files and plain scripts all read fine this way.

use super::{BlockFilter, DocumentSource, ScenarioBlock};
use crate::error::{ReelError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Document source reading a local text file.
pub struct TextFileSource {
    filter: BlockFilter,
    path: Option<PathBuf>,
    content: Option<String>,
}

impl TextFileSource {
    pub fn new(filter: BlockFilter) -> Self {
        Self {
            filter,
            path: None,
            content: None,
        }
    }

    /// A source over in-memory text, already connected.
    pub fn from_text(text: &str, filter: BlockFilter) -> Self {
        Self {
            filter,
            path: None,
            content: Some(text.to_string()),
        }
    }

    fn paragraphs(content: &str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n").trim().to_string());
                    current.clear();
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n").trim().to_string());
        }

        paragraphs
    }
}

impl Default for TextFileSource {
    fn default() -> Self {
        Self::new(BlockFilter::default())
    }
}

impl DocumentSource for TextFileSource {
    fn connect(&mut self, resource: &str) -> Result<()> {
        let path = PathBuf::from(shellexpand::tilde(resource).to_string());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ReelError::Document(format!("Failed to read {}: {}", path.display(), e))
        })?;

        info!("Opened script {:?} ({} bytes)", path, content.len());
        self.path = Some(path);
        self.content = Some(content);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.content.is_some()
    }

    fn extract_blocks(&self) -> Result<Vec<ScenarioBlock>> {
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| ReelError::Document("Not connected to a document".to_string()))?;

        let mut blocks = Vec::new();
        for paragraph in Self::paragraphs(content) {
            if !self.filter.accepts(&paragraph) {
                debug!("Skipping paragraph: {:.30}", paragraph);
                continue;
            }
            let id = format!("paragraph_{}", blocks.len() + 1);
            blocks.push(ScenarioBlock::new(paragraph, id)?);
        }

        debug!("Extracted {} blocks", blocks.len());
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
Глава 1

The city wakes up as the first trams leave the depot.
Steam rises from the river.

Short line

Insert: archive footage

A fisherman repairs his nets on the old wooden pier.
";

    #[test]
    fn test_extracts_filtered_paragraphs() {
        let source = TextFileSource::from_text(SCRIPT, BlockFilter::default());
        let blocks = source.extract_blocks().unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_id, "paragraph_1");
        assert!(blocks[0].text.starts_with("The city wakes up"));
        assert!(blocks[0].text.contains("\nSteam rises"));
        assert_eq!(blocks[1].block_id, "paragraph_2");
        assert!(blocks[1].text.contains("fisherman"));
    }

    #[test]
    fn test_connect_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, SCRIPT).unwrap();

        let mut source = TextFileSource::default();
        assert!(!source.is_connected());
        assert!(source.extract_blocks().is_err());

        source.connect(path.to_str().unwrap()).unwrap();
        assert!(source.is_connected());
        assert_eq!(source.extract_blocks().unwrap().len(), 2);
    }

    #[test]
    fn test_connect_missing_file_fails() {
        let mut source = TextFileSource::default();
        assert!(source.connect("/definitely/not/here.txt").is_err());
        assert!(!source.is_connected());
    }
}
