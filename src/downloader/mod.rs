//! Download planning module

pub mod plan;

// Re-export for convenience
pub use plan::{DownloadPlan, FormatToken, PostProcessor, AUDIO_TOKEN, VIDEO_TOKEN};
