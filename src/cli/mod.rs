//! CLI module for reelmatch.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reelmatch - match script blocks to video footage
///
/// A local-first CLI tool that picks one fitting shot from your indexed
/// footage for every paragraph of a script, avoiding recent repeats and
/// learning from your likes and dislikes.
#[derive(Parser, Debug)]
#[command(name = "reelmatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the embedding server, index and configuration
    Doctor,

    /// Match every block of a script to footage
    Analyze {
        /// Script file (plain text, paragraphs separated by blank lines)
        document: String,

        /// Write the matches to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum score for a match (0.0-1.0), overrides the config
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Review the matches right after the analysis
        #[arg(short, long)]
        review: bool,
    },

    /// Search footage for a text query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Search segments instead of single frames
        #[arg(short, long)]
        segments: bool,
    },

    /// Approve or reject matches from a results file
    Review {
        /// Results file written by `analyze --output`
        results: PathBuf,
    },

    /// Manage footage feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Import extracted frames and segments from a manifest
    Import {
        /// Manifest JSON with `frames` and `segments`
        manifest: PathBuf,

        /// Re-import videos that are already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// List indexed videos
    List,

    /// Drop index entries whose preview images are gone
    Prune,

    /// Inspect or clear local storage
    Storage {
        #[command(subcommand)]
        action: StorageAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum FeedbackAction {
    /// Mark footage as a good match
    Like {
        /// Video file name
        video: String,
        /// Position in seconds
        timestamp: f64,
    },

    /// Mark footage as a bad match
    Dislike {
        /// Video file name
        video: String,
        /// Position in seconds
        timestamp: f64,
    },

    /// Forget feedback for footage
    Clear {
        /// Video file name
        video: String,
        /// Position in seconds
        timestamp: f64,
    },

    /// Show all recorded feedback
    Show,
}

#[derive(Subcommand, Debug)]
pub enum StorageAction {
    /// Show disk usage of the data directory
    Usage,

    /// Delete the index, feedback and extracted frames
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
