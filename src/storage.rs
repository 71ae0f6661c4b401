//! Disk usage and cleanup of the reelmatch data directory.

use crate::config::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files and directories owned by reelmatch.
#[derive(Debug, Clone)]
pub struct StorageService {
    data_dir: PathBuf,
    frames_dir: PathBuf,
    /// Removed on clear.
    files: Vec<PathBuf>,
}

impl StorageService {
    pub fn new(data_dir: PathBuf, frames_dir: PathBuf, files: Vec<PathBuf>) -> Self {
        Self {
            data_dir,
            frames_dir,
            files,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let sqlite = settings.sqlite_path();
        let mut files = vec![settings.feedback_path(), sqlite.clone()];
        for suffix in ["-wal", "-shm"] {
            let mut name = sqlite.clone().into_os_string();
            name.push(suffix);
            files.push(PathBuf::from(name));
        }
        Self::new(settings.data_dir(), settings.frames_dir(), files)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Total size of every file under the data and frames directories.
    /// Entries that cannot be read are skipped.
    pub fn total_size_bytes(&self) -> u64 {
        let mut total = dir_size(&self.data_dir);
        if !self.frames_dir.starts_with(&self.data_dir) {
            total += dir_size(&self.frames_dir);
        }
        for file in &self.files {
            if !file.starts_with(&self.data_dir) && !file.starts_with(&self.frames_dir) {
                total += fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            }
        }
        total
    }

    /// Delete the feedback file, the index database and everything inside the
    /// frames directory. Returns true if every removal succeeded.
    pub fn clear(&self) -> bool {
        let mut success = true;

        if let Ok(entries) = fs::read_dir(&self.frames_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let result = if path.is_dir() && !path.is_symlink() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                if let Err(e) = result {
                    warn!("Failed to delete {:?}: {}", path, e);
                    success = false;
                }
            }
        }

        for file in &self.files {
            if file.exists() {
                if let Err(e) = fs::remove_file(file) {
                    warn!("Failed to delete {:?}: {}", file, e);
                    success = false;
                }
            }
        }

        if let Err(e) = self.ensure_dirs() {
            warn!("Failed to recreate data directories: {}", e);
            success = false;
        }

        info!("Project storage cleared (success: {})", success);
        success
    }

    /// Remove empty directories below the frames directory.
    pub fn remove_empty_frame_dirs(&self) -> usize {
        remove_empty_dirs(&self.frames_dir)
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(&self.frames_dir)
    }
}

fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(ft) if ft.is_dir() => dir_size(&entry.path()),
            Ok(ft) if ft.is_file() => entry.metadata().map(|m| m.len()).unwrap_or(0),
            _ => 0,
        })
        .sum()
}

/// Remove empty subdirectories of `root` (not `root` itself), deepest first.
pub fn remove_empty_dirs(root: &Path) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }
        removed += remove_empty_dirs(&path);
        let is_empty = fs::read_dir(&path)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
