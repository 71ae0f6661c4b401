//! Short-term memory of selected footage, used to avoid repeating a shot.

use crate::visual::VisualUnit;
use std::collections::VecDeque;

/// One remembered selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecencyEntry {
    pub video_filename: String,
    pub timestamp: f64,
}

/// Bounded FIFO of recently selected units.
#[derive(Debug, Clone)]
pub struct RecencyTracker {
    history: VecDeque<RecencyEntry>,
    history_size: usize,
    time_window: f64,
}

impl RecencyTracker {
    pub fn new(history_size: usize, time_window: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(history_size + 1),
            history_size,
            time_window,
        }
    }

    /// Whether a unit of the same video within `time_window` seconds was
    /// selected recently. The bound is strict.
    pub fn is_duplicate(&self, unit: &VisualUnit) -> bool {
        let filename = unit.video_filename();
        let timestamp = unit.representative_timestamp();
        self.history.iter().any(|entry| {
            entry.video_filename == filename
                && (timestamp - entry.timestamp).abs() < self.time_window
        })
    }

    /// Remember a selection, evicting the oldest entry past capacity.
    pub fn add(&mut self, unit: &VisualUnit) {
        self.history.push_back(RecencyEntry {
            video_filename: unit.video_filename().to_string(),
            timestamp: unit.representative_timestamp(),
        });
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &RecencyEntry> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for RecencyTracker {
    fn default() -> Self {
        Self::new(15, 5.0)
    }
}
