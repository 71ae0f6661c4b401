//! Match records produced by an analysis run.

use crate::document::ScenarioBlock;
use crate::feedback::FeedbackKey;
use crate::selection::Selection;
use crate::visual::{format_timecode, format_timecode_range};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SNIPPET_CHARS: usize = 100;

/// One script block matched to one piece of footage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub block_id: String,
    pub text_snippet: String,
    pub video_filename: String,
    /// "MM:SS" for frames, "MM:SS - MM:SS" for segments.
    pub timecode: String,
    pub timestamp_seconds: f64,
    pub score: f32,
    pub preview_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub took_duplicate: bool,
    pub feedback_key: FeedbackKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

impl MatchRecord {
    pub fn from_selection(block: &ScenarioBlock, selection: &Selection, tags: Vec<String>) -> Self {
        let unit = &selection.unit;
        let range = unit.time_range();
        let (timecode, timestamp_seconds) = match range {
            Some((start, end)) => (format_timecode_range(start, end), start),
            None => {
                let ts = unit.representative_timestamp();
                (format_timecode(ts), ts)
            }
        };

        Self {
            block_id: block.block_id.clone(),
            text_snippet: snippet(&block.text),
            video_filename: unit.video_filename().to_string(),
            timecode,
            timestamp_seconds,
            score: selection.score,
            preview_path: unit.preview_path().to_string(),
            tags,
            took_duplicate: selection.took_duplicate,
            feedback_key: FeedbackKey::for_unit(unit),
            start_time: range.map(|(start, _)| start),
            end_time: range.map(|(_, end)| end),
            segment_id: unit.segment_id().map(str::to_string),
        }
    }

    pub fn is_segment(&self) -> bool {
        self.segment_id.is_some()
    }

    /// Score as a whole percentage, for display.
    pub fn percent(&self) -> u32 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// First 100 characters of `text`, with an ellipsis when cut.
pub fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let cut: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Write records as pretty JSON.
pub fn save_records(path: &Path, records: &[MatchRecord]) -> crate::error::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read records written by [`save_records`].
pub fn load_records(path: &Path) -> crate::error::Result<Vec<MatchRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
