//! What to ask the extractor for, derived from the requested format token

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Token selecting audio extraction and mp3 transcoding.
pub const AUDIO_TOKEN: &str = "mp3";

/// Token selecting video merged into an mp4 container.
pub const VIDEO_TOKEN: &str = "mp4";

const AUDIO_SELECTOR: &str = "bestaudio/best";
const VIDEO_SELECTOR: &str = "bestvideo+bestaudio/best";

/// The second command-line argument, passed through verbatim.
///
/// Only `mp3` and `mp4` change behavior. Anything else is a video
/// download whose container is left to yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatToken(String);

impl FormatToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_audio(&self) -> bool {
        self.0 == AUDIO_TOKEN
    }

    pub fn is_video_container(&self) -> bool {
        self.0 == VIDEO_TOKEN
    }

    /// File extension for the output; always the token itself.
    pub fn extension(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormatToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Post-processing step run by the extractor after the fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key")]
pub enum PostProcessor {
    /// Strip the video stream and transcode the audio
    ExtractAudio { codec: String, quality: String },
}

/// Fully specified download request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadPlan {
    pub format_selector: String,
    pub merge_output_format: Option<String>,
    pub output_path: PathBuf,
    pub postprocessors: Vec<PostProcessor>,
}

impl DownloadPlan {
    pub fn new(token: &FormatToken, output_path: PathBuf, audio_quality: &str) -> Self {
        let format_selector = if token.is_audio() {
            AUDIO_SELECTOR
        } else {
            VIDEO_SELECTOR
        };

        let merge_output_format = token.is_video_container().then(|| VIDEO_TOKEN.to_string());

        let postprocessors = if token.is_audio() {
            vec![PostProcessor::ExtractAudio {
                codec: AUDIO_TOKEN.to_string(),
                quality: audio_quality.to_string(),
            }]
        } else {
            Vec::new()
        };

        Self {
            format_selector: format_selector.to_string(),
            merge_output_format,
            output_path,
            postprocessors,
        }
    }
}
