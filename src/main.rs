//! reelmatch CLI entry point.

use anyhow::Result;
use clap::Parser;
use reelmatch::cli::{commands, Cli, Commands};
use reelmatch::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging; -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("reelmatch={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Analyze {
            document,
            output,
            threshold,
            review,
        } => {
            commands::run_analyze(document, output.clone(), *threshold, *review, settings).await?;
        }

        Commands::Search { query, limit, segments } => {
            commands::run_search(query, *limit, *segments, settings).await?;
        }

        Commands::Review { results } => {
            commands::run_review(results, settings)?;
        }

        Commands::Feedback { action } => {
            commands::run_feedback(action, settings)?;
        }

        Commands::Import { manifest, force } => {
            commands::run_import(manifest, *force, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Prune => {
            commands::run_prune(settings).await?;
        }

        Commands::Storage { action } => {
            commands::run_storage(action, settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
