//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.index().list_videos().await {
        Ok(videos) => {
            if videos.is_empty() {
                Output::info("No footage indexed yet. Use 'reelmatch import <manifest.json>' to add some.");
            } else {
                Output::header(&format!("Indexed Videos ({})", videos.len()));
                println!();

                for video in &videos {
                    Output::video_info(
                        &video.video_filename,
                        video.frame_count,
                        video.segment_count,
                        &video.indexed_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let frames: u32 = videos.iter().map(|v| v.frame_count).sum();
                let segments: u32 = videos.iter().map(|v| v.segment_count).sum();
                println!();
                Output::kv("Total videos", &videos.len().to_string());
                Output::kv("Total frames", &frames.to_string());
                Output::kv("Total segments", &segments.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
