//! Import command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::index::ImportManifest;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the import command.
pub async fn run_import(manifest: &Path, force: bool, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    preflight::check(Operation::Import, orchestrator.settings(), orchestrator.index().as_ref()).await?;

    let manifest = ImportManifest::load(manifest)?;
    Output::info(&format!(
        "Manifest lists {} frames and {} segments",
        manifest.frames.len(),
        manifest.segments.len()
    ));

    let spinner = Output::spinner("Embedding preview images...");
    let report = orchestrator.importer().import(manifest, force).await;
    spinner.finish_and_clear();
    let report = report?;

    if report.pruned > 0 {
        Output::info(&format!("Pruned {} stale entries", report.pruned));
    }
    for video in &report.skipped_videos {
        Output::warning(&format!("{} is already indexed (use --force to re-import)", video));
    }
    if report.skipped_units > 0 {
        Output::warning(&format!(
            "Skipped {} entries with missing or invalid images",
            report.skipped_units
        ));
    }
    Output::success(&format!(
        "Indexed {} frames and {} segments",
        report.frames_indexed, report.segments_indexed
    ));

    Ok(())
}
