//! Utility modules for error handling, configuration and file naming

pub mod config;
pub mod error;
pub mod filename;

// Re-export for convenience
pub use config::Settings;
pub use error::GrabberError;
pub use filename::{build_output_path, reserve_output_path, sanitize_title};
