//! Output filename construction
//!
//! Files are named `{title}_{timestamp}.{ext}` inside the output directory.
//! [`build_output_path`] is the pure naming rule; [`reserve_output_path`]
//! applies it against the filesystem and claims a path no other run holds.

use crate::utils::error::GrabberError;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Characters stripped from titles before they become filenames.
pub const RESERVED_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '!'];

/// Title used when the extractor returns none.
pub const FALLBACK_TITLE: &str = "video";

/// Filename length limit (bytes) on common filesystems.
pub const MAX_FILENAME_BYTES: usize = 255;

const MAX_RESERVE_ATTEMPTS: u32 = 10_000;

/// Remove reserved and control characters from a title.
///
/// Unlike a general-purpose sanitizer this never substitutes or pads: an
/// all-reserved title becomes the empty string.
///
/// # Examples
/// ```
/// use grabber::utils::filename::sanitize_title;
/// assert_eq!(sanitize_title("My Video!"), "My Video");
/// assert_eq!(sanitize_title("a/b\\c:d"), "abcd");
/// ```
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !RESERVED_CHARS.contains(c) && !c.is_control())
        .collect()
}

/// `{sanitized_title}_{timestamp}.{extension}` joined onto `dir`.
///
/// `attempt` > 0 appends `-{attempt}` after the timestamp; it is only used to
/// step past an existing file. The title is cut on a char boundary so the
/// whole name stays within [`MAX_FILENAME_BYTES`].
pub fn build_output_path(dir: &Path, title: &str, timestamp: i64, extension: &str, attempt: u32) -> PathBuf {
    let extension = sanitize_title(extension);
    let suffix = if attempt == 0 {
        format!("_{}.{}", timestamp, extension)
    } else {
        format!("_{}-{}.{}", timestamp, attempt, extension)
    };
    let title = sanitize_title(title);
    let title = truncate_to_bytes(&title, MAX_FILENAME_BYTES.saturating_sub(suffix.len()));
    dir.join(format!("{}{}", title, suffix))
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Claim an output path by creating it exclusively.
///
/// The first name from [`build_output_path`] that does not exist yet is
/// created empty and returned, so concurrent runs can never be handed the
/// same path. The caller owns the placeholder.
pub fn reserve_output_path(dir: &Path, title: &str, timestamp: i64, extension: &str) -> Result<PathBuf, GrabberError> {
    for attempt in 0..MAX_RESERVE_ATTEMPTS {
        let candidate = build_output_path(dir, title, timestamp, extension, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => {
                debug!("Reserved output path {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} already exists, trying next suffix", candidate.display());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GrabberError::MissingOutputDirectory(dir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(GrabberError::IoError(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free filename for {:?} in {}", title, dir.display()),
    )))
}

/// Remove a reserved placeholder if nothing was written into it.
pub fn release_placeholder(path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == 0 => {
            if let Err(e) = std::fs::remove_file(path) {
                debug!("Could not remove placeholder {}: {}", path.display(), e);
            }
        }
        _ => {}
    }
}
