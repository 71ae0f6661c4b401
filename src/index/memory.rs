//! In-memory visual index implementation.
//!
//! Useful for testing and small datasets.

use super::{path_exists, IndexCounts, IndexedFrame, IndexedSegment, IndexedVideo, VisualIndex};
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    /// Keyed by preview path.
    frames: HashMap<String, IndexedFrame>,
    /// Keyed by segment id.
    segments: HashMap<String, IndexedSegment>,
}

/// In-memory visual index.
pub struct MemoryVisualIndex {
    tables: RwLock<Tables>,
}

impl MemoryVisualIndex {
    /// Create a new in-memory index.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| ReelError::Index(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| ReelError::Index(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVisualIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisualIndex for MemoryVisualIndex {
    async fn upsert_frames(&self, frames: &[IndexedFrame]) -> Result<usize> {
        let mut tables = self.write()?;
        for frame in frames {
            tables.frames.insert(frame.frame.frame_path.clone(), frame.clone());
        }
        Ok(frames.len())
    }

    async fn upsert_segments(&self, segments: &[IndexedSegment]) -> Result<usize> {
        let mut tables = self.write()?;
        for segment in segments {
            tables
                .segments
                .insert(segment.segment.segment_id.clone(), segment.clone());
        }
        Ok(segments.len())
    }

    async fn load_frames(&self) -> Result<Vec<IndexedFrame>> {
        let tables = self.read()?;
        let mut frames: Vec<IndexedFrame> = tables.frames.values().cloned().collect();
        frames.sort_by(|a, b| {
            a.frame
                .video_filename
                .cmp(&b.frame.video_filename)
                .then(a.frame.timestamp.total_cmp(&b.frame.timestamp))
        });
        Ok(frames)
    }

    async fn load_segments(&self) -> Result<Vec<IndexedSegment>> {
        let tables = self.read()?;
        let mut segments: Vec<IndexedSegment> = tables.segments.values().cloned().collect();
        segments.sort_by(|a, b| {
            a.segment
                .video_filename
                .cmp(&b.segment.video_filename)
                .then(a.segment.start_time.total_cmp(&b.segment.start_time))
        });
        Ok(segments)
    }

    async fn prune_missing(&self) -> Result<usize> {
        let mut tables = self.write()?;
        let before = tables.frames.len() + tables.segments.len();
        tables.frames.retain(|path, _| path_exists(path));
        tables
            .segments
            .retain(|_, s| path_exists(&s.segment.preview_frame_path));
        Ok(before - tables.frames.len() - tables.segments.len())
    }

    async fn delete_video(&self, video_filename: &str) -> Result<usize> {
        let mut tables = self.write()?;
        let before = tables.frames.len() + tables.segments.len();
        tables
            .frames
            .retain(|_, f| f.frame.video_filename != video_filename);
        tables
            .segments
            .retain(|_, s| s.segment.video_filename != video_filename);
        Ok(before - tables.frames.len() - tables.segments.len())
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let tables = self.read()?;
        let mut videos: BTreeMap<String, IndexedVideo> = BTreeMap::new();

        let entries = tables
            .frames
            .values()
            .map(|f| (&f.frame.video_filename, f.indexed_at, true))
            .chain(
                tables
                    .segments
                    .values()
                    .map(|s| (&s.segment.video_filename, s.indexed_at, false)),
            );

        for (filename, indexed_at, is_frame) in entries {
            let entry = videos.entry(filename.clone()).or_insert_with(|| IndexedVideo {
                video_filename: filename.clone(),
                frame_count: 0,
                segment_count: 0,
                indexed_at,
            });
            if is_frame {
                entry.frame_count += 1;
            } else {
                entry.segment_count += 1;
            }
            if indexed_at > entry.indexed_at {
                entry.indexed_at = indexed_at;
            }
        }

        Ok(videos.into_values().collect())
    }

    async fn indexed_files(&self) -> Result<HashSet<String>> {
        let tables = self.read()?;
        Ok(tables
            .frames
            .values()
            .map(|f| f.frame.video_filename.clone())
            .chain(tables.segments.values().map(|s| s.segment.video_filename.clone()))
            .collect())
    }

    async fn counts(&self) -> Result<IndexCounts> {
        let tables = self.read()?;
        Ok(IndexCounts {
            frames: tables.frames.len(),
            segments: tables.segments.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{VideoSegment, VisualFrame};

    #[tokio::test]
    async fn test_memory_visual_index() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.jpg");
        std::fs::write(&kept, b"jpg").unwrap();
        let kept = kept.to_string_lossy().to_string();

        let index = MemoryVisualIndex::new();
        index
            .upsert_frames(&[
                IndexedFrame::new(VisualFrame::new("a.mp4", 2.0, kept.clone()).unwrap(), vec![1.0, 0.0]),
                IndexedFrame::new(VisualFrame::new("a.mp4", 1.0, "/gone/1.jpg").unwrap(), vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        index
            .upsert_segments(&[IndexedSegment::new(
                VideoSegment {
                    video_filename: "b.mp4".to_string(),
                    start_time: 0.0,
                    end_time: 4.0,
                    segment_id: "b-0".to_string(),
                    preview_frame_path: "/gone/b.jpg".to_string(),
                    key_frames: vec![],
                },
                vec![0.5, 0.5],
            )])
            .await
            .unwrap();

        let frames = index.load_frames().await.unwrap();
        assert_eq!(frames[0].frame.timestamp, 1.0);

        let videos = index.list_videos().await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].frame_count, 2);
        assert_eq!(videos[1].segment_count, 1);

        assert_eq!(index.prune_missing().await.unwrap(), 2);
        assert_eq!(index.counts().await.unwrap(), IndexCounts { frames: 1, segments: 0 });
        assert_eq!(
            index.indexed_files().await.unwrap(),
            HashSet::from(["a.mp4".to_string()])
        );

        assert_eq!(index.delete_video("a.mp4").await.unwrap(), 1);
        assert!(index.counts().await.unwrap().is_empty());
    }
}
