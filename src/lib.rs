//! grabber library

pub mod app;
pub mod database;
pub mod downloader;
pub mod extractor;
pub mod utils;

// Re-export main types for easier use
pub use app::{Invocation, Outcome};
pub use downloader::{DownloadPlan, FormatToken, PostProcessor};
pub use extractor::{Extractor, Metadata, YtDlpExtractor};
pub use utils::{GrabberError, Settings};
