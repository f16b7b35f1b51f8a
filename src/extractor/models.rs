//! Data structures for video information

use crate::utils::filename::FALLBACK_TITLE;
use serde::{Deserialize, Serialize};

/// The subset of yt-dlp's info JSON a run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// yt-dlp's name for the site handler that resolved the URL
    #[serde(default)]
    pub extractor: Option<String>,
}

impl Metadata {
    /// The title, or `"video"` when the extractor returned none.
    pub fn title_or_fallback(&self) -> &str {
        self.title.as_deref().unwrap_or(FALLBACK_TITLE)
    }
}
