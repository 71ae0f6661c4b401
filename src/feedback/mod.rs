//! Human feedback on matched footage.
//!
//! Approved and rejected units are remembered by [`FeedbackKey`] and used to
//! promote or demote the same footage in later searches. The store is an
//! explicitly owned object shared through `Arc`; every mutation rewrites the
//! whole JSON file.

mod adjust;

pub use adjust::{clamp_unit, ScoreAdjuster};

use crate::error::{ReelError, Result};
use crate::visual::VisualUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Canonical identity of a piece of footage for feedback purposes:
/// `video_filename|timestamp` with the timestamp rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackKey(String);

impl FeedbackKey {
    pub fn new(video_filename: &str, timestamp: f64) -> Self {
        // Ties go to the even centisecond, matching keys already on disk.
        let rounded = (timestamp * 100.0).round_ties_even() / 100.0;
        Self(format!("{}|{:?}", video_filename, rounded))
    }

    /// Key of the feedback subject of a unit.
    pub fn for_unit(unit: &VisualUnit) -> Self {
        Self::new(unit.video_filename(), unit.feedback_timestamp())
    }

    /// Parse a stored key, checking it has the `name|seconds` shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, ts) = raw
            .rsplit_once('|')
            .ok_or_else(|| ReelError::InvalidInput(format!("Malformed feedback key: {}", raw)))?;
        let ts: f64 = ts
            .parse()
            .map_err(|_| ReelError::InvalidInput(format!("Malformed feedback timestamp: {}", raw)))?;
        if name.is_empty() || ts < 0.0 {
            return Err(ReelError::InvalidInput(format!("Malformed feedback key: {}", raw)));
        }
        Ok(Self::new(name, ts))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedbackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLabel {
    Positive,
    Negative,
}

impl FeedbackLabel {
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            FeedbackLabel::Positive
        } else {
            FeedbackLabel::Negative
        }
    }
}

impl std::fmt::Display for FeedbackLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackLabel::Positive => write!(f, "positive"),
            FeedbackLabel::Negative => write!(f, "negative"),
        }
    }
}

/// On-disk layout of the feedback file. `BTreeSet` keeps both arrays sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    #[serde(default)]
    pub positive: BTreeSet<FeedbackKey>,
    #[serde(default)]
    pub negative: BTreeSet<FeedbackKey>,
}

impl FeedbackSnapshot {
    fn label(&self, key: &FeedbackKey) -> Option<FeedbackLabel> {
        if self.negative.contains(key) {
            Some(FeedbackLabel::Negative)
        } else if self.positive.contains(key) {
            Some(FeedbackLabel::Positive)
        } else {
            None
        }
    }
}

/// Result of recording one feedback event.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    pub key: FeedbackKey,
    pub label: FeedbackLabel,
    /// False when the in-memory state changed but the file write failed.
    pub persisted: bool,
}

/// Result of clearing the feedback for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    /// Whether the key had a label.
    pub removed: bool,
    /// False when a label was removed but the file write failed.
    pub persisted: bool,
}

/// Liked / disliked footage, shared between the search and the reviewer.
pub struct FeedbackStore {
    path: Option<PathBuf>,
    state: RwLock<FeedbackSnapshot>,
    adjuster: ScoreAdjuster,
}

impl FeedbackStore {
    /// Load the store from `path`. A missing or corrupt file yields an empty store.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, adjuster: ScoreAdjuster) -> Self {
        let state = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<FeedbackSnapshot>(&content) {
                Ok(mut snapshot) => {
                    // A key recorded in both sets can only come from a hand edit;
                    // the negative label wins, as it does when scoring.
                    let both: Vec<FeedbackKey> =
                        snapshot.positive.intersection(&snapshot.negative).cloned().collect();
                    for key in both {
                        snapshot.positive.remove(&key);
                    }
                    info!(
                        "Loaded feedback ({} positive, {} negative)",
                        snapshot.positive.len(),
                        snapshot.negative.len()
                    );
                    snapshot
                }
                Err(e) => {
                    warn!("Feedback file is corrupt, starting empty: {}", e);
                    FeedbackSnapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FeedbackSnapshot::default(),
            Err(e) => {
                warn!("Failed to read feedback file, starting empty: {}", e);
                FeedbackSnapshot::default()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            state: RwLock::new(state),
            adjuster,
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(adjuster: ScoreAdjuster) -> Self {
        Self {
            path: None,
            state: RwLock::new(FeedbackSnapshot::default()),
            adjuster,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn adjuster(&self) -> ScoreAdjuster {
        self.adjuster
    }

    /// Current label of a key.
    pub fn label(&self, key: &FeedbackKey) -> Option<FeedbackLabel> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .label(key)
    }

    /// Apply the feedback multiplier for `key` to a raw score.
    pub fn adjust(&self, raw_score: f32, key: &FeedbackKey) -> f32 {
        self.adjuster.adjust(raw_score, self.label(key))
    }

    /// Record feedback for a unit.
    pub fn record(&self, unit: &VisualUnit, positive: bool) -> FeedbackOutcome {
        self.record_key(FeedbackKey::for_unit(unit), FeedbackLabel::from_positive(positive))
    }

    /// Record feedback for a key, moving it out of the opposite set.
    #[instrument(skip(self), fields(key = %key))]
    pub fn record_key(&self, key: FeedbackKey, label: FeedbackLabel) -> FeedbackOutcome {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match label {
            FeedbackLabel::Positive => {
                state.negative.remove(&key);
                state.positive.insert(key.clone());
            }
            FeedbackLabel::Negative => {
                state.positive.remove(&key);
                state.negative.insert(key.clone());
            }
        }
        debug!("Recorded {} feedback", label);

        let persisted = self.persist_locked(&state);
        FeedbackOutcome { key, label, persisted }
    }

    /// Forget any feedback for a key.
    pub fn clear(&self, key: &FeedbackKey) -> ClearOutcome {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed = state.positive.remove(key) | state.negative.remove(key);
        let persisted = !removed || self.persist_locked(&state);
        ClearOutcome { removed, persisted }
    }

    /// Number of (positive, negative) keys.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.positive.len(), state.negative.len())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FeedbackSnapshot {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Write the full state while the caller holds the write lock.
    /// Failures are logged; the in-memory state stays authoritative.
    fn persist_locked(&self, state: &FeedbackSnapshot) -> bool {
        let Some(path) = &self.path else {
            return true;
        };
        match write_snapshot(path, state) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist feedback to {:?}: {}", path, e);
                false
            }
        }
    }
}

/// Replace the feedback file with `state` via a temp file and rename.
fn write_snapshot(path: &Path, state: &FeedbackSnapshot) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let content = serde_json::to_string_pretty(state)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| ReelError::Feedback(format!("cannot replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::VisualFrame;
    use std::sync::Arc;

    fn frame(name: &str, ts: f64) -> VisualUnit {
        VisualFrame::new(name, ts, format!("/frames/{}_{}.jpg", name, ts))
            .unwrap()
            .into()
    }

    #[test]
    fn test_key_format() {
        assert_eq!(FeedbackKey::new("a.mp4", 12.3456).as_str(), "a.mp4|12.35");
        assert_eq!(FeedbackKey::new("a.mp4", 3.0).as_str(), "a.mp4|3.0");
        assert_eq!(FeedbackKey::new("a.mp4", 7.5).as_str(), "a.mp4|7.5");
        assert_eq!(FeedbackKey::new("a.mp4", 0.125).as_str(), "a.mp4|0.12");
        assert_eq!(FeedbackKey::new("a.mp4", 10.625).as_str(), "a.mp4|10.62");
        assert_eq!(FeedbackKey::new("a.mp4", 0.375).as_str(), "a.mp4|0.38");
        // Sub-centisecond differences collide by construction.
        assert_eq!(FeedbackKey::new("a.mp4", 1.001), FeedbackKey::new("a.mp4", 1.004));
    }

    #[test]
    fn test_key_parse() {
        let key = FeedbackKey::parse("my|clip.mp4|4.25").unwrap();
        assert_eq!(key.as_str(), "my|clip.mp4|4.25");
        assert!(FeedbackKey::parse("no-separator").is_err());
        assert!(FeedbackKey::parse("a.mp4|abc").is_err());
    }

    #[test]
    fn test_feedback_exclusivity() {
        let store = FeedbackStore::in_memory(ScoreAdjuster::default());
        let unit = frame("a.mp4", 10.0);
        let key = FeedbackKey::for_unit(&unit);

        store.record(&unit, false);
        assert_eq!(store.label(&key), Some(FeedbackLabel::Negative));

        store.record(&unit, true);
        let snapshot = store.snapshot();
        assert!(snapshot.positive.contains(&key));
        assert!(!snapshot.negative.contains(&key));
        assert_eq!(store.counts(), (1, 0));
    }

    #[test]
    fn test_adjust_uses_label() {
        let store = FeedbackStore::in_memory(ScoreAdjuster::default());
        let liked = frame("a.mp4", 1.0);
        let disliked = frame("a.mp4", 2.0);
        store.record(&liked, true);
        store.record(&disliked, false);

        let raw = 0.6;
        let up = store.adjust(raw, &FeedbackKey::for_unit(&liked));
        let neutral = store.adjust(raw, &FeedbackKey::new("a.mp4", 3.0));
        let down = store.adjust(raw, &FeedbackKey::for_unit(&disliked));
        assert!(up >= neutral && neutral >= down);
        assert!((down - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("feedback.json");

        let store = FeedbackStore::load(&path, ScoreAdjuster::default());
        let outcome = store.record(&frame("b.mp4", 5.0), true);
        assert!(outcome.persisted);
        store.record(&frame("a.mp4", 1.25), false);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["positive"], serde_json::json!(["b.mp4|5.0"]));
        assert_eq!(raw["negative"], serde_json::json!(["a.mp4|1.25"]));

        let reloaded = FeedbackStore::load(&path, ScoreAdjuster::default());
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FeedbackStore::load(&path, ScoreAdjuster::default());
        assert_eq!(store.counts(), (0, 0));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // The parent "directory" is a regular file, so every write fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("feedback.json");

        let store = FeedbackStore::load(&path, ScoreAdjuster::default());
        let unit = frame("a.mp4", 1.0);
        let outcome = store.record(&unit, true);

        assert!(!outcome.persisted);
        assert_eq!(store.label(&FeedbackKey::for_unit(&unit)), Some(FeedbackLabel::Positive));
    }

    #[test]
    fn test_clear_removes_key() {
        let store = FeedbackStore::in_memory(ScoreAdjuster::default());
        let unit = frame("a.mp4", 1.0);
        store.record(&unit, true);
        assert!(store.clear(&FeedbackKey::for_unit(&unit)).removed);
        assert!(!store.clear(&FeedbackKey::for_unit(&unit)).removed);
        assert_eq!(store.counts(), (0, 0));
    }

    #[test]
    fn test_clear_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.json");
        let store = FeedbackStore::load(&path, ScoreAdjuster::default());
        let unit = frame("a.mp4", 1.0);
        assert!(store.record(&unit, true).persisted);

        // Swap the file for a directory so the rename fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let outcome = store.clear(&FeedbackKey::for_unit(&unit));
        assert!(outcome.removed);
        assert!(!outcome.persisted);
        assert_eq!(store.counts(), (0, 0));

        let untouched = store.clear(&FeedbackKey::new("other.mp4", 2.0));
        assert_eq!(untouched, ClearOutcome { removed: false, persisted: true });
    }

    #[test]
    fn test_concurrent_recording() {
        let store = Arc::new(FeedbackStore::in_memory(ScoreAdjuster::default()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let unit = frame("shared.mp4", (j % 10) as f64);
                        store.record(&unit, (i + j) % 2 == 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert!(snapshot.positive.is_disjoint(&snapshot.negative));
        assert_eq!(snapshot.positive.len() + snapshot.negative.len(), 10);
    }
}
