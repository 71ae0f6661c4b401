//! Analyze command implementation.

use super::review::review_interactively;
use crate::analysis::{save_records, AnalysisEvent};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::document::DocumentSource;
use crate::orchestrator::Orchestrator;
use anyhow::{bail, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run the analyze command.
pub async fn run_analyze(
    document: &str,
    output: Option<PathBuf>,
    threshold: Option<f32>,
    review: bool,
    settings: Settings,
) -> Result<()> {
    if let Some(t) = threshold {
        if !(0.0..=1.0).contains(&t) {
            bail!("--threshold must be between 0.0 and 1.0, got {}", t);
        }
    }

    let orchestrator = Orchestrator::new(settings)?;
    preflight::check(Operation::Analyze, orchestrator.settings(), orchestrator.index().as_ref()).await?;

    let spinner = Output::spinner("Loading visual index...");
    let analyzer = orchestrator.analyzer().await;
    spinner.finish_and_clear();
    let mut analyzer = analyzer?;
    if let Some(t) = threshold {
        analyzer = analyzer.with_threshold(t);
    }
    let analyzer = Arc::new(analyzer);

    let mut source = orchestrator.document_source();
    source.connect(document)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn({
        let analyzer = analyzer.clone();
        let resource = document.to_string();
        async move { analyzer.analyze(&mut source, &resource, &tx).await }
    });

    let mut progress: Option<ProgressBar> = None;
    while let Some(event) = rx.recv().await {
        match event {
            AnalysisEvent::Progress { index, total } => {
                let bar = progress
                    .get_or_insert_with(|| Output::progress_bar(total as u64, "Matching blocks"));
                bar.set_position(index.saturating_sub(1) as u64);
            }
            AnalysisEvent::ResultFound(record) => {
                if let Some(bar) = &progress {
                    bar.set_message(format!("{} -> {}", record.block_id, record.video_filename));
                }
            }
            AnalysisEvent::BlockFailed { index, block_id, error } => {
                let msg = format!("Block {} ({}) failed: {}", index, block_id, error);
                match &progress {
                    Some(bar) => bar.suspend(|| Output::warning(&msg)),
                    None => Output::warning(&msg),
                }
            }
            AnalysisEvent::Finished { .. } => {
                if let Some(bar) = progress.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }

    let report = task.await??;

    if report.records.is_empty() {
        Output::warning("No footage matched any block. Try a lower --threshold.");
    } else {
        Output::header(&format!("Matches ({})", report.records.len()));
        for record in &report.records {
            Output::match_record(record);
        }
    }

    println!();
    Output::kv("Blocks", &report.total_blocks.to_string());
    Output::kv("Matched", &report.records.len().to_string());
    Output::kv("Without match", &report.unmatched_blocks().to_string());
    if report.failed_blocks > 0 {
        Output::kv("Failed", &report.failed_blocks.to_string());
    }
    Output::kv("Threshold", &format!("{:.2}", analyzer.policy().score_threshold()));

    if let Some(path) = output {
        save_records(&path, &report.records)?;
        Output::success(&format!("Saved matches to {}", path.display()));
    }

    if review && !report.records.is_empty() {
        review_interactively(&report.records, &orchestrator.feedback())?;
    }

    Ok(())
}
