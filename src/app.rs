//! One fetch, start to finish
//!
//! metadata → reserve output path → download → verify what landed on disk.

use crate::downloader::{DownloadPlan, FormatToken};
use crate::extractor::{Extractor, Metadata};
use crate::utils::error::GrabberError;
use crate::utils::filename::{release_placeholder, reserve_output_path};
use crate::utils::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The two positional arguments
#[derive(Debug, Clone)]
pub struct Invocation {
    pub url: String,
    pub format: FormatToken,
}

impl Invocation {
    pub fn new(url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: FormatToken::new(format),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct Outcome {
    /// File that was written; the value printed to stdout
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// Fetch `invocation.url` into `settings.output_dir`.
///
/// `timestamp` is the uniqueness token (seconds since the Unix epoch).
pub async fn run(
    extractor: &dyn Extractor,
    settings: &Settings,
    invocation: &Invocation,
    timestamp: i64,
) -> Result<Outcome> {
    prepare_output_dir(settings)?;

    info!("Fetching metadata via {} for {}", extractor.id(), invocation.url);
    let metadata = extractor.fetch_metadata(&invocation.url).await?;
    let title = metadata.title_or_fallback();
    debug!(
        "Title {:?}, id {:?}, resolved by {}",
        title,
        metadata.id,
        metadata.extractor.as_deref().unwrap_or("unknown extractor")
    );

    let reserved = reserve_output_path(
        &settings.output_dir,
        title,
        timestamp,
        invocation.format.extension(),
    )?;
    let plan = DownloadPlan::new(&invocation.format, reserved.clone(), &settings.audio_quality);

    info!("Downloading {} as {}", invocation.url, invocation.format);
    let reported = match extractor.fetch(&invocation.url, &plan).await {
        Ok(reported) => reported,
        Err(e) => {
            release_placeholder(&reserved);
            return Err(e);
        }
    };

    let path = resolve_written_path(&reserved, reported.as_deref())?;
    info!("Saved {}", path.display());

    Ok(Outcome { path, metadata })
}

fn prepare_output_dir(settings: &Settings) -> Result<()> {
    let dir = &settings.output_dir;
    if dir.is_dir() {
        return Ok(());
    }
    if !settings.create_output_dir {
        return Err(GrabberError::MissingOutputDirectory(dir.clone()).into());
    }
    // create_dir_all succeeds when another run created it first
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    debug!("Created output directory {}", dir.display());
    Ok(())
}

/// Pick the path to report: the extractor's own answer when it points at a
/// real file, else the reserved path if something was written into it.
fn resolve_written_path(reserved: &Path, reported: Option<&Path>) -> Result<PathBuf> {
    if let Some(reported) = reported {
        if is_nonempty_file(reported) {
            if !same_file(reported, reserved) {
                warn!(
                    "yt-dlp wrote {} instead of {}",
                    reported.display(),
                    reserved.display()
                );
                release_placeholder(reserved);
            }
            return Ok(reported.to_path_buf());
        }
        warn!("yt-dlp reported {} but it is missing or empty", reported.display());
    }

    if is_nonempty_file(reserved) {
        return Ok(reserved.to_path_buf());
    }

    release_placeholder(reserved);
    Err(GrabberError::OutputNotFound(reserved.to_path_buf()).into())
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
