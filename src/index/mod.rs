//! Visual index abstraction for reelmatch.
//!
//! Stores imported frames and segments together with their image
//! embeddings. Provides a trait-based interface for different backends.

mod import;
mod memory;
mod sqlite;

pub use import::{ImportManifest, ImportReport, Importer, ManifestSegment};
pub use memory::MemoryVisualIndex;
pub use sqlite::SqliteVisualIndex;

use crate::error::Result;
use crate::visual::{VideoSegment, VisualFrame};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A frame stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFrame {
    pub frame: VisualFrame,
    /// Image embedding of the preview.
    pub embedding: Vec<f32>,
    /// When this frame was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedFrame {
    pub fn new(frame: VisualFrame, embedding: Vec<f32>) -> Self {
        Self {
            frame,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A segment stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSegment {
    pub segment: VideoSegment,
    /// Mean of the key frame embeddings.
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl IndexedSegment {
    pub fn new(segment: VideoSegment, embedding: Vec<f32>) -> Self {
        Self {
            segment,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub video_filename: String,
    pub frame_count: u32,
    pub segment_count: u32,
    /// When the video was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Row counts of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    pub frames: usize,
    pub segments: usize,
}

impl IndexCounts {
    pub fn is_empty(&self) -> bool {
        self.frames == 0 && self.segments == 0
    }
}

/// Trait for visual index implementations.
#[async_trait]
pub trait VisualIndex: Send + Sync {
    /// Insert or replace frames (keyed by preview path).
    async fn upsert_frames(&self, frames: &[IndexedFrame]) -> Result<usize>;

    /// Insert or replace segments (keyed by segment id).
    async fn upsert_segments(&self, segments: &[IndexedSegment]) -> Result<usize>;

    /// All frames, ordered by video and timestamp.
    async fn load_frames(&self) -> Result<Vec<IndexedFrame>>;

    /// All segments, ordered by video and start time.
    async fn load_segments(&self) -> Result<Vec<IndexedSegment>>;

    /// Remove entries whose preview image no longer exists. Returns the number removed.
    async fn prune_missing(&self) -> Result<usize>;

    /// Remove every entry of a video.
    async fn delete_video(&self, video_filename: &str) -> Result<usize>;

    /// List all indexed videos.
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>>;

    /// File names of all indexed videos.
    async fn indexed_files(&self) -> Result<HashSet<String>>;

    /// Number of stored frames and segments.
    async fn counts(&self) -> Result<IndexCounts>;
}

fn path_exists(path: &str) -> bool {
    !path.is_empty() && std::path::Path::new(path).exists()
}
