use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinotesError {
    #[error("Notes section not found in backup")]
    SectionNotFound,

    #[error("No .bak backup file found in {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MinotesError>;
