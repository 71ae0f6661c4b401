//! Doctor command - verify the embedding server, index and configuration.

use crate::cli::output::format_size;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::feedback::{FeedbackStore, ScoreAdjuster};
use crate::index::{SqliteVisualIndex, VisualIndex};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("reelmatch Doctor");
    println!();
    println!("Checking embedding server, index and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Embedding Server").bold());
    let server = check_embedding_server(settings).await;
    server.print();
    checks.push(server);

    println!();

    println!("{}", style("Storage").bold());
    let mut storage_checks = check_directories(settings);
    storage_checks.push(check_index(settings).await);
    storage_checks.push(check_feedback(settings));
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config(settings);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using reelmatch.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! reelmatch is ready to use.");
    }

    Ok(())
}

async fn check_embedding_server(settings: &Settings) -> CheckResult {
    let endpoint = &settings.embedding.endpoint;
    match preflight::check_embedding_server(endpoint).await {
        Ok(()) => CheckResult::ok(
            "Endpoint",
            &format!("{} ({})", endpoint, settings.embedding.model),
        ),
        Err(e) => CheckResult::error(
            "Endpoint",
            &e.to_string(),
            "Start the embedding server or set [embedding].endpoint",
        ),
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for (name, dir) in [("Data directory", settings.data_dir()), ("Frames directory", settings.frames_dir())] {
        if dir.exists() {
            results.push(CheckResult::ok(name, &dir.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                name,
                &format!("{} (will be created)", dir.display()),
                "Directory will be created on first use",
            ));
        }
    }

    results
}

async fn check_index(settings: &Settings) -> CheckResult {
    let db_path = settings.sqlite_path();
    if !db_path.exists() {
        return CheckResult::warning(
            "Index",
            &format!("{} (not created yet)", db_path.display()),
            "Import footage with: reelmatch import <manifest.json>",
        );
    }

    let size = std::fs::metadata(&db_path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());
    let counts = match SqliteVisualIndex::new(&db_path) {
        Ok(index) => index.counts().await,
        Err(e) => Err(e),
    };

    match counts {
        Ok(counts) if counts.is_empty() => CheckResult::warning(
            "Index",
            &format!("{} ({}, empty)", db_path.display(), size),
            "Import footage with: reelmatch import <manifest.json>",
        ),
        Ok(counts) => CheckResult::ok(
            "Index",
            &format!(
                "{} ({}, {} frames, {} segments)",
                db_path.display(),
                size,
                counts.frames,
                counts.segments
            ),
        ),
        Err(e) => CheckResult::error(
            "Index",
            &format!("cannot be read: {}", e),
            "Delete it with: reelmatch storage clear",
        ),
    }
}

fn check_feedback(settings: &Settings) -> CheckResult {
    let path = settings.feedback_path();
    if !path.exists() {
        return CheckResult::ok("Feedback", "none recorded yet");
    }
    let store = FeedbackStore::load(&path, ScoreAdjuster::from(&settings.scoring));
    let (liked, disliked) = store.counts();
    CheckResult::ok(
        "Feedback",
        &format!("{} ({} liked, {} disliked)", path.display(), liked, disliked),
    )
}

fn check_config(settings: &Settings) -> CheckResult {
    if let Err(e) = settings.validate() {
        return CheckResult::error("Config", &e.to_string(), "Fix with: reelmatch config edit");
    }
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: reelmatch config edit",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[tokio::test]
    async fn test_missing_index_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.index.sqlite_path = dir.path().join("none.db").to_string_lossy().into_owned();

        let result = check_index(&settings).await;
        assert_eq!(result.status, CheckStatus::Warning);
    }
}
