//! SQLite-based visual index implementation.
//!
//! Embeddings are stored as little-endian f32 blobs; similarity is computed
//! in Rust after loading, since the whole index is kept in memory for search.

use super::{path_exists, IndexCounts, IndexedFrame, IndexedSegment, IndexedVideo, VisualIndex};
use crate::error::{ReelError, Result};
use crate::visual::{VideoSegment, VisualFrame};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS frames (
        frame_path TEXT PRIMARY KEY,
        video_filename TEXT NOT NULL,
        timestamp REAL NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_frames_video ON frames(video_filename);

    CREATE TABLE IF NOT EXISTS segments (
        segment_id TEXT PRIMARY KEY,
        video_filename TEXT NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        preview_frame_path TEXT NOT NULL,
        key_frames_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_segments_video ON segments(video_filename);
"#;

/// SQLite-based visual index.
pub struct SqliteVisualIndex {
    conn: Mutex<Connection>,
}

impl SqliteVisualIndex {
    /// Open (or create) an index database.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened visual index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ReelError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl VisualIndex for SqliteVisualIndex {
    #[instrument(skip(self, frames), fields(count = frames.len()))]
    async fn upsert_frames(&self, frames: &[IndexedFrame]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in frames {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO frames
                (frame_path, video_filename, timestamp, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    entry.frame.frame_path,
                    entry.frame.video_filename,
                    entry.frame.timestamp,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Upserted {} frames", frames.len());
        Ok(frames.len())
    }

    #[instrument(skip(self, segments), fields(count = segments.len()))]
    async fn upsert_segments(&self, segments: &[IndexedSegment]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in segments {
            let segment = &entry.segment;
            tx.execute(
                r#"
                INSERT OR REPLACE INTO segments
                (segment_id, video_filename, start_time, end_time, preview_frame_path,
                 key_frames_json, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    segment.segment_id,
                    segment.video_filename,
                    segment.start_time,
                    segment.end_time,
                    segment.preview_frame_path,
                    serde_json::to_string(&segment.key_frames)?,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Upserted {} segments", segments.len());
        Ok(segments.len())
    }

    #[instrument(skip(self))]
    async fn load_frames(&self) -> Result<Vec<IndexedFrame>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT frame_path, video_filename, timestamp, embedding, indexed_at
            FROM frames
            ORDER BY video_filename, timestamp
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(3)?;
            let indexed_at: String = row.get(4)?;
            Ok(IndexedFrame {
                frame: VisualFrame {
                    frame_path: row.get(0)?,
                    video_filename: row.get(1)?,
                    timestamp: row.get(2)?,
                },
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: Self::parse_time(&indexed_at),
            })
        })?;

        let frames: Vec<IndexedFrame> = rows.collect::<std::result::Result<_, _>>()?;
        debug!("Loaded {} frames", frames.len());
        Ok(frames)
    }

    #[instrument(skip(self))]
    async fn load_segments(&self) -> Result<Vec<IndexedSegment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT segment_id, video_filename, start_time, end_time, preview_frame_path,
                   key_frames_json, embedding, indexed_at
            FROM segments
            ORDER BY video_filename, start_time
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let key_frames_json: String = row.get(5)?;
            let embedding_bytes: Vec<u8> = row.get(6)?;
            let indexed_at: String = row.get(7)?;
            Ok((
                VideoSegment {
                    segment_id: row.get(0)?,
                    video_filename: row.get(1)?,
                    start_time: row.get(2)?,
                    end_time: row.get(3)?,
                    preview_frame_path: row.get(4)?,
                    key_frames: Vec::new(),
                },
                key_frames_json,
                embedding_bytes,
                indexed_at,
            ))
        })?;

        let mut segments = Vec::new();
        for row in rows {
            let (mut segment, key_frames_json, embedding_bytes, indexed_at) = row?;
            segment.key_frames = serde_json::from_str(&key_frames_json)?;
            segments.push(IndexedSegment {
                segment,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: Self::parse_time(&indexed_at),
            });
        }

        debug!("Loaded {} segments", segments.len());
        Ok(segments)
    }

    #[instrument(skip(self))]
    async fn prune_missing(&self) -> Result<usize> {
        let conn = self.lock()?;

        let frame_paths: Vec<String> = conn
            .prepare("SELECT frame_path FROM frames")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        let segment_previews: Vec<(String, String)> = conn
            .prepare("SELECT segment_id, preview_frame_path FROM segments")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let tx = conn.unchecked_transaction()?;
        let mut removed = 0;
        for path in frame_paths.iter().filter(|p| !path_exists(p)) {
            removed += tx.execute("DELETE FROM frames WHERE frame_path = ?1", params![path])?;
        }
        for (segment_id, _) in segment_previews.iter().filter(|(_, p)| !path_exists(p)) {
            removed += tx.execute("DELETE FROM segments WHERE segment_id = ?1", params![segment_id])?;
        }
        tx.commit()?;

        if removed > 0 {
            info!("Pruned {} entries with missing preview images", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, video_filename: &str) -> Result<usize> {
        let conn = self.lock()?;
        let frames = conn.execute(
            "DELETE FROM frames WHERE video_filename = ?1",
            params![video_filename],
        )?;
        let segments = conn.execute(
            "DELETE FROM segments WHERE video_filename = ?1",
            params![video_filename],
        )?;

        info!("Deleted {} frames and {} segments for {}", frames, segments, video_filename);
        Ok(frames + segments)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT video_filename, SUM(is_frame), SUM(1 - is_frame), MAX(indexed_at)
            FROM (
                SELECT video_filename, 1 AS is_frame, indexed_at FROM frames
                UNION ALL
                SELECT video_filename, 0 AS is_frame, indexed_at FROM segments
            )
            GROUP BY video_filename
            ORDER BY video_filename
            "#,
        )?;

        let videos = stmt.query_map([], |row| {
            let frame_count: i64 = row.get(1)?;
            let segment_count: i64 = row.get(2)?;
            let indexed_at: String = row.get(3)?;
            Ok(IndexedVideo {
                video_filename: row.get(0)?,
                frame_count: frame_count as u32,
                segment_count: segment_count as u32,
                indexed_at: Self::parse_time(&indexed_at),
            })
        })?;

        let result: Vec<IndexedVideo> = videos.collect::<std::result::Result<_, _>>()?;
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn indexed_files(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT video_filename FROM frames UNION SELECT video_filename FROM segments",
        )?;
        let files = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(files)
    }

    async fn counts(&self) -> Result<IndexCounts> {
        let conn = self.lock()?;
        let frames: i64 = conn.query_row("SELECT COUNT(*) FROM frames", [], |row| row.get(0))?;
        let segments: i64 = conn.query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0))?;
        Ok(IndexCounts {
            frames: frames as usize,
            segments: segments as usize,
        })
    }
}
