//! Prune command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the prune command.
pub async fn run_prune(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let removed = orchestrator.index().prune_missing().await?;
    let dirs = orchestrator.storage().remove_empty_frame_dirs();

    if removed == 0 {
        Output::info("Index is clean, every preview image exists.");
    } else {
        Output::success(&format!("Removed {} entries with missing preview images", removed));
    }
    if dirs > 0 {
        Output::info(&format!("Removed {} empty frame directories", dirs));
    }

    Ok(())
}
