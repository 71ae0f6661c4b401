//! CLI command implementations.

mod analyze;
mod config;
mod doctor;
mod feedback;
mod import;
mod list;
mod prune;
mod review;
mod search;
mod storage;

pub use analyze::run_analyze;
pub use config::run_config;
pub use doctor::run_doctor;
pub use feedback::run_feedback;
pub use import::run_import;
pub use list::run_list;
pub use prune::run_prune;
pub use review::run_review;
pub use search::run_search;
pub use storage::run_storage;
