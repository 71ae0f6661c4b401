//! Embedding client for a local multimodal (CLIP-style) embedding server.
//!
//! The server exposes `POST /embed/text` and `POST /embed/image`, both
//! answering `{"embeddings": [[f32, ...], ...]}` in request order.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    model: &'a str,
    inputs: &'a [String],
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP-based embedder.
pub struct HttpEmbedder {
    client: reqwest::Client,
    text_url: Url,
    image_url: Url,
    model: String,
    batch_size: usize,
}

impl HttpEmbedder {
    /// Create an embedder for the server at `endpoint`.
    pub fn new(endpoint: &str, model: &str, batch_size: usize) -> Result<Self> {
        let base = Url::parse(endpoint)
            .map_err(|e| ReelError::Config(format!("Invalid embedding endpoint '{}': {}", endpoint, e)))?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ReelError::Config(format!("Invalid embedding endpoint '{}': {}", endpoint, e)))
        };

        Ok(Self {
            client: reqwest::Client::new(),
            text_url: join("embed/text")?,
            image_url: join("embed/image")?,
            model: model.to_string(),
            batch_size: batch_size.max(1),
        })
    }

    /// Create an embedder from settings.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Self::new(&settings.endpoint, &settings.model, settings.batch_size)
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &Url, body: &T, expected: usize) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embeddings.len() != expected {
            return Err(ReelError::Embedding(format!(
                "Expected {} embeddings, server returned {}",
                expected,
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ReelError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let request = TextRequest {
                model: &self.model,
                inputs: chunk,
            };
            all_embeddings.extend(self.post(&self.text_url, &request, chunk.len()).await?);
        }

        debug!("Generated {} text embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    #[instrument(skip(self, paths), fields(count = paths.len()))]
    async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(self.batch_size) {
            let request = ImageRequest {
                model: &self.model,
                paths: chunk.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
            };
            all_embeddings.extend(self.post(&self.image_url, &request, chunk.len()).await?);
        }

        debug!("Generated {} image embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = HttpEmbedder::new("http://127.0.0.1:8765", "clip", 0).unwrap();
        assert_eq!(embedder.model(), "clip");
        assert_eq!(embedder.batch_size, 1);
        assert_eq!(embedder.text_url.as_str(), "http://127.0.0.1:8765/embed/text");
        assert_eq!(embedder.image_url.as_str(), "http://127.0.0.1:8765/embed/image");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(HttpEmbedder::new("not a url", "clip", 8).is_err());
    }
}
