//! Storage command implementation.

use crate::cli::output::format_size;
use crate::cli::{Output, StorageAction};
use crate::config::Settings;
use crate::storage::StorageService;
use anyhow::{bail, Result};
use std::io::{self, Write};

/// Run the storage command.
pub fn run_storage(action: &StorageAction, settings: Settings) -> Result<()> {
    let storage = StorageService::from_settings(&settings);

    match action {
        StorageAction::Usage => {
            Output::kv("Data directory", &storage.data_dir().display().to_string());
            Output::kv("Used", &format_size(storage.total_size_bytes()));
        }

        StorageAction::Clear { yes } => {
            let size = format_size(storage.total_size_bytes());
            if !yes && !prompt_continue(&format!("Delete the index, feedback and frames ({})?", size))? {
                Output::info("Nothing deleted.");
                return Ok(());
            }

            if storage.clear() {
                Output::success("Project storage cleared.");
            } else {
                bail!("Some files could not be deleted; run with -v for details");
            }
        }
    }

    Ok(())
}

/// Prompt user to continue (y/n).
fn prompt_continue(message: &str) -> Result<bool> {
    print!("  {} [y/N] ", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}
