//! yt-dlp wrapper for metadata extraction and downloading
//!
//! Both operations spawn the same yt-dlp binary with options rendered from a
//! single [`YtDlpOptions`]; only the [`Mode`] differs between the two calls.

use crate::downloader::{DownloadPlan, PostProcessor};
use crate::extractor::models::Metadata;
use crate::extractor::traits::Extractor;
use crate::utils::error::GrabberError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// What a yt-dlp invocation should do
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    /// Print the info JSON, transfer nothing
    Metadata,
    /// Fetch media according to the plan
    Download(&'a DownloadPlan),
}

/// Options shared by every invocation in a run
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub quiet: bool,
    pub no_playlist: bool,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            quiet: true,
            no_playlist: true,
        }
    }
}

impl YtDlpOptions {
    /// Render the command line (without the program) for `url` in `mode`.
    pub fn args(&self, url: &str, mode: Mode<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if self.quiet {
            args.push("--quiet".into());
            args.push("--no-warnings".into());
        }
        if self.no_playlist {
            args.push("--no-playlist".into());
        }

        match mode {
            Mode::Metadata => {
                args.push("--dump-single-json".into());
                args.push("--skip-download".into());
            }
            Mode::Download(plan) => {
                args.push("-f".into());
                args.push(plan.format_selector.clone().into());

                if let Some(container) = &plan.merge_output_format {
                    args.push("--merge-output-format".into());
                    args.push(container.into());
                }

                args.push("-o".into());
                args.push(output_template(&plan.output_path));
                // The output path is a reserved, empty placeholder
                args.push("--force-overwrites".into());

                for pp in &plan.postprocessors {
                    match pp {
                        PostProcessor::ExtractAudio { codec, quality } => {
                            args.push("--extract-audio".into());
                            args.push("--audio-format".into());
                            args.push(codec.into());
                            args.push("--audio-quality".into());
                            args.push(quality.into());
                        }
                    }
                }

                args.push("--no-simulate".into());
                args.push("--print".into());
                args.push("after_move:filepath".into());
            }
        }

        args.push("--".into());
        args.push(url.into());
        args
    }
}

/// yt-dlp treats `%` in `-o` as a template field; escape literal ones.
fn output_template(path: &Path) -> OsString {
    path.to_string_lossy().replace('%', "%%").into()
}

/// Extractor backed by the yt-dlp executable
pub struct YtDlpExtractor {
    ytdlp_path: PathBuf,
    options: YtDlpOptions,
}

impl YtDlpExtractor {
    /// Use `explicit` when given, otherwise search for yt-dlp.
    ///
    /// Search order:
    /// 1. Next to the current executable
    /// 2. System PATH
    /// 3. Common installation paths (Homebrew, pip --user, etc.)
    pub fn new(explicit: Option<PathBuf>) -> Result<Self> {
        let ytdlp_path = match explicit {
            Some(path) if path.is_file() => path,
            Some(path) => {
                error!("Configured yt-dlp does not exist: {}", path.display());
                return Err(GrabberError::YtDlpNotFound.into());
            }
            None => match find_ytdlp() {
                Some(path) => path,
                None => {
                    error!("yt-dlp not found anywhere!");
                    return Err(GrabberError::YtDlpNotFound.into());
                }
            },
        };

        info!("Using yt-dlp at: {}", ytdlp_path.display());
        Ok(Self::with_path(ytdlp_path))
    }

    /// Wrap a known binary without checking it
    pub fn with_path(ytdlp_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            options: YtDlpOptions::default(),
        }
    }

    async fn run(&self, url: &str, mode: Mode<'_>) -> Result<Output> {
        let args = self.options.args(url, mode);
        debug!("Running {} {:?}", self.ytdlp_path.display(), args);

        AsyncCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ytdlp_path.display()))
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    /// Uses: yt-dlp --dump-single-json --skip-download
    async fn fetch_metadata(&self, url: &str) -> Result<Metadata> {
        debug!("Extracting video info for URL: {}", url);

        let output = self.run(url, Mode::Metadata).await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp extraction failed: {}", error_msg.trim());
            return Err(GrabberError::ExtractionError(failure_message(&output)).into());
        }

        let metadata: Metadata = serde_json::from_slice(&output.stdout).map_err(|e| {
            GrabberError::ExtractionError(format!("yt-dlp returned unreadable metadata: {}", e))
        })?;

        debug!("Resolved id={:?} title={:?}", metadata.id, metadata.title);
        Ok(metadata)
    }

    async fn fetch(&self, url: &str, plan: &DownloadPlan) -> Result<Option<PathBuf>> {
        debug!("Downloading {} to {}", url, plan.output_path.display());

        let output = self.run(url, Mode::Download(plan)).await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!("yt-dlp download failed: {}", stderr.trim());
            return Err(GrabberError::DownloadError(failure_message(&output)).into());
        }
        if !stderr.trim().is_empty() {
            debug!("yt-dlp stderr: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let written = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from);

        if written.is_none() {
            warn!("yt-dlp did not report the final file path");
        }
        Ok(written)
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("yt-dlp exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Next to the current executable
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(local) = find_next_to_exe() {
        debug!("Using yt-dlp next to executable: {:?}", local);
        return Some(local);
    }

    if let Some(system) = find_in_path() {
        debug!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere!");
    None
}

fn find_next_to_exe() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let candidate = exe_path.parent()?.join(binary_name());
    (candidate.is_file() && is_executable(&candidate)).then_some(candidate)
}

fn find_in_path() -> Option<PathBuf> {
    which::which("yt-dlp").ok().filter(|path| path.exists())
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        // System
        "/usr/bin/yt-dlp",
        // pip --user / pipx
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .map(|p| expand_home(p))
        .find(|p| p.is_file() && is_executable(p))
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::FormatToken;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn plan(token: &str, path: &str) -> DownloadPlan {
        DownloadPlan::new(&FormatToken::from(token), PathBuf::from(path), "192")
    }

    #[test]
    fn test_metadata_args() {
        let args = strings(YtDlpOptions::default().args("https://example.com/v", Mode::Metadata));
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(!args.contains(&"-o".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://example.com/v"]);
    }

    #[test]
    fn test_video_download_args() {
        let plan = plan("mp4", "downloads/My Video_1700000000.mp4");
        let args = strings(YtDlpOptions::default().args("u", Mode::Download(&plan)));

        let find = |flag: &str| args.iter().position(|a| a == flag).map(|i| args[i + 1].clone());
        assert_eq!(find("-f").as_deref(), Some("bestvideo+bestaudio/best"));
        assert_eq!(find("--merge-output-format").as_deref(), Some("mp4"));
        assert_eq!(find("-o").as_deref(), Some("downloads/My Video_1700000000.mp4"));
        assert_eq!(find("--print").as_deref(), Some("after_move:filepath"));
        assert!(!args.contains(&"--extract-audio".to_string()));
    }

    #[test]
    fn test_audio_download_args() {
        let plan = plan("mp3", "downloads/song_1.mp3");
        let args = strings(YtDlpOptions::default().args("u", Mode::Download(&plan)));

        let find = |flag: &str| args.iter().position(|a| a == flag).map(|i| args[i + 1].clone());
        assert_eq!(find("-f").as_deref(), Some("bestaudio/best"));
        assert_eq!(find("--audio-format").as_deref(), Some("mp3"));
        assert_eq!(find("--audio-quality").as_deref(), Some("192"));
        assert_eq!(args.iter().filter(|a| *a == "--extract-audio").count(), 1);
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_url_cannot_be_read_as_option() {
        let args = strings(YtDlpOptions::default().args("--exec=rm", Mode::Metadata));
        assert_eq!(&args[args.len() - 2..], ["--", "--exec=rm"]);
    }

    #[test]
    fn test_output_template_escapes_percent() {
        assert_eq!(
            output_template(Path::new("downloads/100% real_1.mp4")),
            OsString::from("downloads/100%% real_1.mp4")
        );
    }

    #[test]
    fn test_missing_explicit_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = YtDlpExtractor::new(Some(dir.path().join("yt-dlp"))).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<GrabberError>(),
            Some(GrabberError::YtDlpNotFound)
        ));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/usr/bin/yt-dlp"), PathBuf::from("/usr/bin/yt-dlp"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.local/bin/yt-dlp"), home.join(".local/bin/yt-dlp"));
        }
    }

    #[test]
    fn test_is_executable() {
        let path = PathBuf::from("/bin/sh");
        if cfg!(unix) && path.exists() {
            assert!(is_executable(&path));
        }
    }
}
