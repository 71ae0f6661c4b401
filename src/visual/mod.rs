//! Visual units: frames and segments extracted from source videos.
//!
//! Units are created by the external scene detector, imported into the
//! index, and never mutated afterwards (they are only pruned when the
//! preview image disappears from disk).

use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};

/// A single key frame of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualFrame {
    /// File name of the source video.
    pub video_filename: String,
    /// Position of the frame in the video (seconds).
    pub timestamp: f64,
    /// Path of the extracted preview image.
    pub frame_path: String,
}

impl VisualFrame {
    /// Create a validated frame.
    pub fn new(video_filename: impl Into<String>, timestamp: f64, frame_path: impl Into<String>) -> Result<Self> {
        let frame = Self {
            video_filename: video_filename.into(),
            timestamp,
            frame_path: frame_path.into(),
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check the frame invariants.
    pub fn validate(&self) -> Result<()> {
        if self.video_filename.is_empty() {
            return Err(ReelError::InvalidUnit("video filename cannot be empty".to_string()));
        }
        if !(self.timestamp >= 0.0) {
            return Err(ReelError::InvalidUnit(format!(
                "timestamp must be non-negative, got {}",
                self.timestamp
            )));
        }
        Ok(())
    }
}

/// A contiguous scene of a video, described by several key frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    pub video_filename: String,
    pub start_time: f64,
    pub end_time: f64,
    pub segment_id: String,
    pub preview_frame_path: String,
    #[serde(default)]
    pub key_frames: Vec<VisualFrame>,
}

impl VideoSegment {
    /// Check the segment invariants.
    pub fn validate(&self) -> Result<()> {
        if self.video_filename.is_empty() {
            return Err(ReelError::InvalidUnit("video filename cannot be empty".to_string()));
        }
        if !(self.start_time >= 0.0) {
            return Err(ReelError::InvalidUnit(format!(
                "segment start must be non-negative, got {}",
                self.start_time
            )));
        }
        if !(self.end_time > self.start_time) {
            return Err(ReelError::InvalidUnit(format!(
                "segment end ({}) must be after start ({})",
                self.end_time, self.start_time
            )));
        }
        if self.segment_id.is_empty() {
            return Err(ReelError::InvalidUnit("segment id cannot be empty".to_string()));
        }
        if self.preview_frame_path.is_empty() {
            return Err(ReelError::InvalidUnit("preview frame path cannot be empty".to_string()));
        }
        for frame in &self.key_frames {
            frame.validate()?;
        }
        Ok(())
    }

    /// Duration of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Midpoint of the segment, used as its position for deduplication.
    pub fn middle_timestamp(&self) -> f64 {
        (self.start_time + self.end_time) / 2.0
    }
}

/// Anything a text block can be matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VisualUnit {
    Frame(VisualFrame),
    Segment(VideoSegment),
}

impl VisualUnit {
    pub fn video_filename(&self) -> &str {
        match self {
            VisualUnit::Frame(f) => &f.video_filename,
            VisualUnit::Segment(s) => &s.video_filename,
        }
    }

    /// The single timestamp standing for this unit.
    pub fn representative_timestamp(&self) -> f64 {
        match self {
            VisualUnit::Frame(f) => f.timestamp,
            VisualUnit::Segment(s) => s.middle_timestamp(),
        }
    }

    /// Path of the image shown for this unit.
    pub fn preview_path(&self) -> &str {
        match self {
            VisualUnit::Frame(f) => &f.frame_path,
            VisualUnit::Segment(s) => &s.preview_frame_path,
        }
    }

    /// Timestamp used to derive the feedback key.
    ///
    /// Segments attach feedback to their first key frame so that likes given
    /// to a segment carry over to the frame index and back.
    pub fn feedback_timestamp(&self) -> f64 {
        match self {
            VisualUnit::Frame(f) => f.timestamp,
            VisualUnit::Segment(s) => s
                .key_frames
                .first()
                .map(|f| f.timestamp)
                .unwrap_or_else(|| s.middle_timestamp()),
        }
    }

    /// Segment bounds, if this is a segment.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        match self {
            VisualUnit::Frame(_) => None,
            VisualUnit::Segment(s) => Some((s.start_time, s.end_time)),
        }
    }

    pub fn segment_id(&self) -> Option<&str> {
        match self {
            VisualUnit::Frame(_) => None,
            VisualUnit::Segment(s) => Some(&s.segment_id),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            VisualUnit::Frame(f) => f.validate(),
            VisualUnit::Segment(s) => s.validate(),
        }
    }
}

impl From<VisualFrame> for VisualUnit {
    fn from(frame: VisualFrame) -> Self {
        VisualUnit::Frame(frame)
    }
}

impl From<VideoSegment> for VisualUnit {
    fn from(segment: VideoSegment) -> Self {
        VisualUnit::Segment(segment)
    }
}

/// Format seconds as MM:SS. Minutes are not folded into hours.
pub fn format_timecode(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Format a segment range as "MM:SS - MM:SS".
pub fn format_timecode_range(start: f64, end: f64) -> String {
    format!("{} - {}", format_timecode(start), format_timecode(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64) -> VideoSegment {
        VideoSegment {
            video_filename: "clip.mp4".to_string(),
            start_time: start,
            end_time: end,
            segment_id: "seg-1".to_string(),
            preview_frame_path: "/frames/seg-1.jpg".to_string(),
            key_frames: vec![],
        }
    }

    #[test]
    fn test_frame_validation() {
        assert!(VisualFrame::new("a.mp4", 0.0, "a.jpg").is_ok());
        assert!(VisualFrame::new("a.mp4", -1.0, "a.jpg").is_err());
        assert!(VisualFrame::new("", 1.0, "a.jpg").is_err());
        assert!(VisualFrame::new("a.mp4", f64::NAN, "a.jpg").is_err());
    }

    #[test]
    fn test_segment_validation() {
        assert!(segment(1.0, 2.0).validate().is_ok());
        assert!(segment(2.0, 2.0).validate().is_err());
        assert!(segment(-1.0, 2.0).validate().is_err());

        let mut no_id = segment(1.0, 2.0);
        no_id.segment_id.clear();
        assert!(no_id.validate().is_err());
    }

    #[test]
    fn test_segment_representative_is_midpoint() {
        let unit = VisualUnit::from(segment(10.0, 20.0));
        assert_eq!(unit.representative_timestamp(), 15.0);
        assert_eq!(unit.time_range(), Some((10.0, 20.0)));
        // No key frames: feedback falls back to the midpoint.
        assert_eq!(unit.feedback_timestamp(), 15.0);
    }

    #[test]
    fn test_segment_feedback_uses_first_key_frame() {
        let mut seg = segment(10.0, 20.0);
        seg.key_frames = vec![
            VisualFrame::new("clip.mp4", 11.5, "k1.jpg").unwrap(),
            VisualFrame::new("clip.mp4", 18.0, "k2.jpg").unwrap(),
        ];
        assert_eq!(VisualUnit::from(seg).feedback_timestamp(), 11.5);
    }

    #[test]
    fn test_timecode_format() {
        assert_eq!(format_timecode(0.0), "00:00");
        assert_eq!(format_timecode(125.9), "02:05");
        assert_eq!(format_timecode(4503.0), "75:03");
        assert_eq!(format_timecode_range(61.0, 75.5), "01:01 - 01:15");
    }
}
