//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::search::CandidateSearch;
use crate::visual::{format_timecode, format_timecode_range};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, segments: bool, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    preflight::check(Operation::Search, orchestrator.settings(), orchestrator.index().as_ref()).await?;

    let spinner = Output::spinner("Searching...");
    let results = match orchestrator.open_search().await {
        Ok(search) if segments => search.search_segments(query, limit).await,
        Ok(search) => search.search(query, limit).await,
        Err(e) => Err(e),
    };
    spinner.finish_and_clear();

    match results {
        Ok(candidates) => {
            if candidates.is_empty() {
                Output::warning("No footage found matching your query.");
            } else {
                Output::success(&format!("Found {} results", candidates.len()));

                for candidate in &candidates {
                    let unit = &candidate.unit;
                    let timecode = match unit.time_range() {
                        Some((start, end)) => format_timecode_range(start, end),
                        None => format_timecode(unit.representative_timestamp()),
                    };
                    Output::search_result(unit.video_filename(), &timecode, candidate.score, unit.preview_path());
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
