use std::path::PathBuf;
use thiserror::Error;

pub type CleanerResult<T> = Result<T, CleanerError>;

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("installer cache location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("not an orphan in the current result: {}", .0.display())]
    NotAnOrphan(PathBuf),
    #[error("unsupported platform")]
    UnsupportedPlatform,
}
