use crate::downloader::DownloadPlan;
use crate::extractor::models::Metadata;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// The two things a run needs from an extraction backend.
///
/// yt-dlp is the only backend shipped; tests substitute their own.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a short identifier for logs (e.g. "yt-dlp")
    fn id(&self) -> &'static str;

    /// Fetch title and id without transferring any media
    async fn fetch_metadata(&self, url: &str) -> Result<Metadata>;

    /// Download (and post-process) `url` to `plan.output_path`.
    ///
    /// Returns the path the backend says it finally wrote, when it reports one.
    async fn fetch(&self, url: &str, plan: &DownloadPlan) -> Result<Option<PathBuf>>;
}
