//! Runtime configuration

use crate::utils::error::GrabberError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory media lands in unless configured otherwise, relative to the cwd.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Bitrate (kbps) used when transcoding to mp3.
pub const DEFAULT_AUDIO_QUALITY: &str = "192";

/// Settings for a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where downloaded files are written
    pub output_dir: PathBuf,

    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Audio transcoding quality handed to yt-dlp
    pub audio_quality: String,

    /// Create `output_dir` when missing instead of failing
    pub create_output_dir: bool,

    /// SQLite file recording completed downloads
    pub history_db: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ytdlp_path: None,
            audio_quality: DEFAULT_AUDIO_QUALITY.to_string(),
            create_output_dir: false,
            history_db: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(settings)
    }

    /// Reject values yt-dlp cannot use.
    ///
    /// `audio_quality` is a VBR level (`0`-`10`) or a bitrate such as `192`
    /// or `192K`.
    pub fn validate(&self) -> Result<(), GrabberError> {
        let digits = self
            .audio_quality
            .strip_suffix(['K', 'k'])
            .unwrap_or(&self.audio_quality);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(GrabberError::InvalidSetting(format!(
                "audio_quality {:?} is neither a VBR level nor a bitrate",
                self.audio_quality
            )));
        }
        Ok(())
    }

    /// Defaults, or the contents of `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from("downloads"));
        assert_eq!(settings.audio_quality, "192");
        assert!(!settings.create_output_dir);
        assert!(settings.ytdlp_path.is_none());
        assert!(settings.history_db.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_dir": "/srv/media", "create_output_dir": true}}"#).unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/srv/media"));
        assert!(settings.create_output_dir);
        assert_eq!(settings.audio_quality, DEFAULT_AUDIO_QUALITY);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_audio_quality_validation() {
        for ok in ["192", "320K", "128k", "0", "5"] {
            let settings = Settings {
                audio_quality: ok.to_string(),
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "{:?} should be accepted", ok);
        }
        for bad in ["", "K", "loud", "192 kbps", "-1"] {
            let settings = Settings {
                audio_quality: bad.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(settings.validate(), Err(GrabberError::InvalidSetting(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_empty_audio_quality_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"audio_quality": ""}}"#).unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GrabberError>(),
            Some(GrabberError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json"))).is_err());
    }
}
