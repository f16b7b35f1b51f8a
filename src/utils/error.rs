//! Error handling for grabber

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for grabber
#[derive(Debug, Error)]
pub enum GrabberError {
    #[error("yt-dlp not found. Please install yt-dlp or pass --yt-dlp <PATH>")]
    YtDlpNotFound,

    #[error("Failed to extract video info: {0}")]
    ExtractionError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Output directory does not exist: {}", .0.display())]
    MissingOutputDirectory(PathBuf),

    #[error("yt-dlp reported success but no file was written at {}", .0.display())]
    OutputNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}
