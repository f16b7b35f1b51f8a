//! Download history

pub mod operations;
pub mod schema;

// Re-export for convenience
pub use operations::{DownloadRecord, HistoryStats, HistoryStore};
pub use schema::initialize_database;
