//! reelmatch - match script blocks to video footage
//!
//! A local-first CLI tool that picks one fitting shot from indexed footage for
//! every paragraph of a script.
//!
//! # Overview
//!
//! reelmatch allows you to:
//! - Import extracted frames and scene segments with their image embeddings
//! - Match every block of a script to footage, avoiding recent repeats
//! - Search footage with free text
//! - Like or dislike footage and have future rankings follow your taste
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `visual` - Frames, segments and timecodes
//! - `embedding` - Text and image embeddings from an embedding server
//! - `index` - Visual index storage and manifest import
//! - `feedback` - Persistent likes and dislikes, score adjustment
//! - `search` - Candidate search with text and tag sub-queries
//! - `selection` - Recency tracking and the Unique > Duplicate > Nothing policy
//! - `document` - Script sources split into blocks
//! - `analysis` - The block processing loop
//! - `storage` - Disk usage and cleanup
//! - `orchestrator` - Component wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use reelmatch::config::Settings;
//! use reelmatch::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let analyzer = orchestrator.analyzer().await?;
//!     let mut source = orchestrator.document_source();
//!     let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//!
//!     let report = analyzer.analyze(&mut source, "script.txt", &tx).await?;
//!     println!("Matched {} of {} blocks", report.records.len(), report.total_blocks);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod feedback;
pub mod index;
pub mod orchestrator;
pub mod search;
pub mod selection;
pub mod storage;
pub mod visual;

pub use error::{ReelError, Result};
