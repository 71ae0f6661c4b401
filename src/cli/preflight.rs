//! Pre-flight checks before expensive operations.
//!
//! Validates that the embedding server and the index are available before
//! starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{ReelError, Result};
use crate::index::VisualIndex;
use std::time::Duration;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Import needs the embedding server.
    Import,
    /// Analysis needs the embedding server and a non-empty index.
    Analyze,
    /// Search needs the same as analysis.
    Search,
}

/// Run pre-flight checks for the given operation.
pub async fn check(operation: Operation, settings: &Settings, index: &dyn VisualIndex) -> Result<()> {
    match operation {
        Operation::Import => {
            check_embedding_server(&settings.embedding.endpoint).await?;
        }
        Operation::Analyze | Operation::Search => {
            check_index(index).await?;
            check_embedding_server(&settings.embedding.endpoint).await?;
        }
    }
    Ok(())
}

/// Check that something answers at the embedding endpoint.
pub async fn check_embedding_server(endpoint: &str) -> Result<()> {
    let url = url::Url::parse(endpoint)
        .map_err(|e| ReelError::Config(format!("Invalid embedding endpoint '{}': {}", endpoint, e)))?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;

    // Any HTTP answer counts; only connection failures are fatal.
    client.get(url).send().await.map_err(|e| {
        ReelError::Embedding(format!(
            "Embedding server at {} is not reachable ({}). Start it or fix [embedding].endpoint",
            endpoint, e
        ))
    })?;
    Ok(())
}

async fn check_index(index: &dyn VisualIndex) -> Result<()> {
    if index.counts().await?.is_empty() {
        return Err(ReelError::NotReady(
            "the visual index is empty. Run: reelmatch import <manifest.json>".to_string(),
        ));
    }
    Ok(())
}
