//! Loader collaborator: locates and reads the backup file.

use crate::error::{MinotesError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the first `.bak` file in `dir` (sorted for determinism).
pub fn find_backup(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("bak"))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| MinotesError::BackupNotFound(dir.to_path_buf()))
}

pub fn read(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}
