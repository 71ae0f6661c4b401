//! Import of extracted frames and segments into the visual index.
//!
//! Frame extraction and scene detection happen outside reelmatch; they leave
//! a JSON manifest next to the preview images which is read here.

use super::{IndexedFrame, IndexedSegment, VisualIndex};
use crate::embedding::{mean_embedding, Embedder};
use crate::error::{ReelError, Result};
use crate::visual::{VideoSegment, VisualFrame};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Contents of an import manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportManifest {
    #[serde(default)]
    pub frames: Vec<VisualFrame>,
    #[serde(default)]
    pub segments: Vec<ManifestSegment>,
}

/// A segment as written by the extractor; the id may be left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSegment {
    pub video_filename: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub segment_id: Option<String>,
    pub preview_frame_path: String,
    #[serde(default)]
    pub key_frames: Vec<VisualFrame>,
}

impl ManifestSegment {
    fn into_segment(self) -> VideoSegment {
        VideoSegment {
            video_filename: self.video_filename,
            start_time: self.start_time,
            end_time: self.end_time,
            segment_id: self
                .segment_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            preview_frame_path: self.preview_frame_path,
            key_frames: self.key_frames,
        }
    }
}

impl ImportManifest {
    /// Read a manifest. Relative image paths are resolved against the
    /// manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReelError::InvalidInput(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        let mut manifest: ImportManifest = serde_json::from_str(&content)?;

        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut String| {
            if !p.is_empty() && Path::new(p.as_str()).is_relative() {
                *p = base.join(p.as_str()).to_string_lossy().into_owned();
            }
        };
        for frame in &mut self.frames {
            resolve(&mut frame.frame_path);
        }
        for segment in &mut self.segments {
            resolve(&mut segment.preview_frame_path);
            for frame in &mut segment.key_frames {
                resolve(&mut frame.frame_path);
            }
        }
    }

    /// Names of all videos the manifest mentions.
    pub fn video_filenames(&self) -> BTreeSet<String> {
        self.frames
            .iter()
            .map(|f| f.video_filename.clone())
            .chain(self.segments.iter().map(|s| s.video_filename.clone()))
            .collect()
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub pruned: usize,
    pub frames_indexed: usize,
    pub segments_indexed: usize,
    /// Videos skipped because they were already indexed.
    pub skipped_videos: Vec<String>,
    /// Frames and segments dropped for missing or invalid images.
    pub skipped_units: usize,
}

/// Embeds manifest entries and stores them in a [`VisualIndex`].
pub struct Importer {
    index: Arc<dyn VisualIndex>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl Importer {
    pub fn new(index: Arc<dyn VisualIndex>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            index,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Import a manifest.
    ///
    /// Stale entries are pruned first. Videos already in the index are
    /// skipped unless `force` is set, in which case they are replaced.
    #[instrument(skip(self, manifest), fields(frames = manifest.frames.len(), segments = manifest.segments.len()))]
    pub async fn import(&self, manifest: ImportManifest, force: bool) -> Result<ImportReport> {
        let mut report = ImportReport {
            pruned: self.index.prune_missing().await?,
            ..Default::default()
        };
        if report.pruned > 0 {
            info!("Pruned {} entries with missing images", report.pruned);
        }

        let indexed = self.index.indexed_files().await?;
        let mut skip: HashSet<String> = HashSet::new();
        let mut replace: Vec<String> = Vec::new();
        for video in manifest.video_filenames() {
            if !indexed.contains(&video) {
                continue;
            }
            if force {
                replace.push(video);
            } else {
                info!("{} is already indexed, skipping", video);
                report.skipped_videos.push(video.clone());
                skip.insert(video);
            }
        }

        let frames: Vec<VisualFrame> = manifest
            .frames
            .into_iter()
            .filter(|f| !skip.contains(&f.video_filename))
            .filter(|f| usable(f.validate(), &f.frame_path, &mut report.skipped_units))
            .collect();

        let segments: Vec<(VideoSegment, Vec<String>)> = manifest
            .segments
            .into_iter()
            .filter(|s| !skip.contains(&s.video_filename))
            .filter_map(|s| {
                let segment = s.into_segment();
                let images = segment_images(&segment);
                if let Err(e) = segment.validate() {
                    warn!("Skipping segment {}: {}", segment.segment_id, e);
                    report.skipped_units += 1;
                    return None;
                }
                if images.is_empty() {
                    warn!("Skipping segment {}: no key frame images found", segment.segment_id);
                    report.skipped_units += 1;
                    return None;
                }
                Some((segment, images))
            })
            .collect();

        let mut paths: Vec<String> = frames.iter().map(|f| f.frame_path.clone()).collect();
        paths.extend(segments.iter().flat_map(|(_, images)| images.iter().cloned()));
        let embeddings = self.embed_paths(paths).await?;

        let indexed_frames: Vec<IndexedFrame> = frames
            .into_iter()
            .filter_map(|f| {
                let embedding = embeddings.get(&f.frame_path)?.clone();
                Some(IndexedFrame::new(f, embedding))
            })
            .collect();

        let mut indexed_segments = Vec::with_capacity(segments.len());
        for (segment, images) in segments {
            let vectors: Vec<Vec<f32>> = images
                .iter()
                .filter_map(|p| embeddings.get(p).cloned())
                .collect();
            match mean_embedding(&vectors) {
                Some(embedding) => indexed_segments.push(IndexedSegment::new(segment, embedding)),
                None => {
                    warn!("Skipping segment {}: inconsistent embeddings", segment.segment_id);
                    report.skipped_units += 1;
                }
            }
        }

        // Old rows go only once the replacement embeddings exist.
        for video in &replace {
            let removed = self.index.delete_video(video).await?;
            debug!("Replacing {} ({} entries removed)", video, removed);
        }

        report.frames_indexed = self.index.upsert_frames(&indexed_frames).await?;
        report.segments_indexed = self.index.upsert_segments(&indexed_segments).await?;

        info!(
            "Imported {} frames and {} segments",
            report.frames_indexed, report.segments_indexed
        );
        Ok(report)
    }

    /// Embed each distinct path once, `batch_size` images per request.
    async fn embed_paths(&self, paths: Vec<String>) -> Result<HashMap<String, Vec<f32>>> {
        let mut unique: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            if seen.insert(path.clone()) {
                unique.push(path);
            }
        }

        let mut embeddings = HashMap::with_capacity(unique.len());
        let batches = unique.len().div_ceil(self.batch_size);
        for (n, batch) in unique.chunks(self.batch_size).enumerate() {
            debug!("Embedding image batch {}/{}", n + 1, batches);
            let files: Vec<PathBuf> = batch.iter().map(PathBuf::from).collect();
            let vectors = self.embedder.embed_images(&files).await?;
            if vectors.len() != batch.len() {
                return Err(ReelError::Embedding(format!(
                    "expected {} image embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(batch.iter().cloned().zip(vectors));
        }
        Ok(embeddings)
    }
}

fn usable(validation: Result<()>, image: &str, skipped: &mut usize) -> bool {
    if let Err(e) = validation {
        warn!("Skipping {}: {}", image, e);
        *skipped += 1;
        return false;
    }
    if !super::path_exists(image) {
        warn!("Skipping {}: image not found", image);
        *skipped += 1;
        return false;
    }
    true
}

/// Existing images describing a segment: its key frames, or the preview when
/// the extractor listed none.
fn segment_images(segment: &VideoSegment) -> Vec<String> {
    let candidates: Vec<&str> = if segment.key_frames.is_empty() {
        vec![segment.preview_frame_path.as_str()]
    } else {
        segment.key_frames.iter().map(|f| f.frame_path.as_str()).collect()
    };
    candidates
        .into_iter()
        .filter(|p| super::path_exists(p))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryVisualIndex;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds an image as `[file size, 1]` and counts requests.
    #[derive(Default)]
    struct SizeEmbedder {
        requests: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for SizeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 0.0]).collect())
        }

        async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>> {
            self.requests.lock().unwrap().push(paths.len());
            if self.fail {
                return Err(ReelError::Embedding("server went away".to_string()));
            }
            paths
                .iter()
                .map(|p| Ok(vec![std::fs::metadata(p)?.len() as f32, 1.0]))
                .collect()
        }

        fn model(&self) -> &str {
            "size"
        }
    }

    fn write_image(dir: &Path, name: &str, bytes: usize) -> String {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; bytes]).unwrap();
        name.to_string()
    }

    fn manifest_json(dir: &Path) -> PathBuf {
        write_image(dir, "a_1.jpg", 2);
        write_image(dir, "a_2.jpg", 4);
        write_image(dir, "a_seg.jpg", 8);
        let json = serde_json::json!({
            "frames": [
                { "video_filename": "a.mp4", "timestamp": 1.0, "frame_path": "a_1.jpg" },
                { "video_filename": "a.mp4", "timestamp": 2.0, "frame_path": "a_2.jpg" },
                { "video_filename": "a.mp4", "timestamp": 3.0, "frame_path": "missing.jpg" }
            ],
            "segments": [
                {
                    "video_filename": "a.mp4",
                    "start_time": 0.0,
                    "end_time": 2.5,
                    "preview_frame_path": "a_seg.jpg",
                    "key_frames": [
                        { "video_filename": "a.mp4", "timestamp": 1.0, "frame_path": "a_1.jpg" },
                        { "video_filename": "a.mp4", "timestamp": 2.0, "frame_path": "a_2.jpg" }
                    ]
                },
                {
                    "video_filename": "a.mp4",
                    "start_time": 5.0,
                    "end_time": 6.0,
                    "segment_id": "gone",
                    "preview_frame_path": "a_seg.jpg",
                    "key_frames": [
                        { "video_filename": "a.mp4", "timestamp": 5.5, "frame_path": "nope.jpg" }
                    ]
                }
            ]
        });
        let path = dir.join("manifest.json");
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ImportManifest::load(&manifest_json(dir.path())).unwrap();
        assert!(manifest.frames[0].frame_path.starts_with(dir.path().to_str().unwrap()));

        let index = Arc::new(MemoryVisualIndex::new());
        let embedder = Arc::new(SizeEmbedder::default());
        let importer = Importer::new(index.clone(), embedder.clone(), 1);

        let report = importer.import(manifest, false).await.unwrap();
        assert_eq!(report.frames_indexed, 2);
        assert_eq!(report.segments_indexed, 1);
        assert_eq!(report.skipped_units, 2);
        // Shared key frames are embedded once.
        assert_eq!(*embedder.requests.lock().unwrap(), vec![1, 1]);

        let segments = index.load_segments().await.unwrap();
        assert_eq!(segments[0].embedding, vec![3.0, 1.0]);
        assert!(!segments[0].segment.segment_id.is_empty());
    }

    #[tokio::test]
    async fn test_reimport_skips_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_json(dir.path());
        let index = Arc::new(MemoryVisualIndex::new());
        let importer = Importer::new(index.clone(), Arc::new(SizeEmbedder::default()), 32);

        importer.import(ImportManifest::load(&path).unwrap(), false).await.unwrap();

        let again = importer.import(ImportManifest::load(&path).unwrap(), false).await.unwrap();
        assert_eq!(again.skipped_videos, vec!["a.mp4".to_string()]);
        assert_eq!(again.frames_indexed, 0);

        let forced = importer.import(ImportManifest::load(&path).unwrap(), true).await.unwrap();
        assert!(forced.skipped_videos.is_empty());
        assert_eq!(forced.frames_indexed, 2);
        // Generated segment ids differ between imports; the old one was replaced.
        assert_eq!(index.counts().await.unwrap().segments, 1);
    }

    #[tokio::test]
    async fn test_failed_forced_reimport_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_json(dir.path());
        let index = Arc::new(MemoryVisualIndex::new());

        let importer = Importer::new(index.clone(), Arc::new(SizeEmbedder::default()), 32);
        importer.import(ImportManifest::load(&path).unwrap(), false).await.unwrap();
        let before = index.counts().await.unwrap();
        assert_eq!(before.frames, 2);

        let failing = SizeEmbedder {
            fail: true,
            ..Default::default()
        };
        let importer = Importer::new(index.clone(), Arc::new(failing), 32);
        let result = importer.import(ImportManifest::load(&path).unwrap(), true).await;
        assert!(matches!(result, Err(ReelError::Embedding(_))));

        let after = index.counts().await.unwrap();
        assert_eq!(after.frames, before.frames);
        assert_eq!(after.segments, before.segments);
    }

    #[tokio::test]
    async fn test_prunes_before_import() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(MemoryVisualIndex::new());
        let stale = dir.path().join("stale.jpg");
        std::fs::write(&stale, "x").unwrap();
        index
            .upsert_frames(&[IndexedFrame::new(
                VisualFrame::new("old.mp4", 1.0, stale.to_string_lossy()).unwrap(),
                vec![1.0, 1.0],
            )])
            .await
            .unwrap();
        std::fs::remove_file(&stale).unwrap();

        let importer = Importer::new(index.clone(), Arc::new(SizeEmbedder::default()), 8);
        let report = importer.import(ImportManifest::default(), false).await.unwrap();
        assert_eq!(report.pruned, 1);
        assert!(index.counts().await.unwrap().is_empty());
    }
}
