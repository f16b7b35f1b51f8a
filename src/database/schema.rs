//! Database schema

use crate::utils::error::GrabberError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::debug;

/// Open (creating if needed) the history database at `db_path`
pub async fn initialize_database(db_path: &Path) -> Result<Pool<Sqlite>, GrabberError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    // One run, one writer
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    debug!("History database ready at {}", db_path.display());

    Ok(pool)
}

/// Create database tables
async fn create_tables(pool: &Pool<Sqlite>) -> Result<(), GrabberError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS downloads (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            video_id TEXT NOT NULL,
            title TEXT NOT NULL,
            format TEXT NOT NULL,
            output_path TEXT NOT NULL,
            downloaded_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_downloads_format ON downloads(format)")
        .execute(pool)
        .await?;

    Ok(())
}
