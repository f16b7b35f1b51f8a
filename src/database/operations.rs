//! History reads and writes

use crate::app::Outcome;
use crate::utils::error::GrabberError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// History store
pub struct HistoryStore {
    pool: Pool<Sqlite>,
}

impl HistoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Save download record
    pub async fn record(&self, record: &DownloadRecord) -> Result<(), GrabberError> {
        sqlx::query(
            r#"
            INSERT INTO downloads
            (id, url, video_id, title, format, output_path, downloaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.url)
        .bind(&record.video_id)
        .bind(&record.title)
        .bind(&record.format)
        .bind(record.output_path.to_string_lossy().into_owned())
        .bind(record.downloaded_at)
        .execute(&self.pool)
        .await?;

        debug!("Saved download record: {}", record.id);
        Ok(())
    }

    /// All downloads, newest first
    pub async fn all(&self) -> Result<Vec<DownloadRecord>, GrabberError> {
        let rows = sqlx::query("SELECT * FROM downloads ORDER BY downloaded_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut downloads = Vec::with_capacity(rows.len());
        for row in rows {
            downloads.push(row_into_download_record(row)?);
        }

        Ok(downloads)
    }

    /// Total count and count per format token
    pub async fn stats(&self) -> Result<HistoryStats, GrabberError> {
        let rows = sqlx::query("SELECT format, COUNT(*) AS count FROM downloads GROUP BY format")
            .fetch_all(&self.pool)
            .await?;

        let mut stats = HistoryStats::default();
        for row in rows {
            let count = row.try_get::<i64, _>("count")? as u64;
            stats.total += count;
            stats.by_format.insert(row.try_get("format")?, count);
        }

        Ok(stats)
    }
}

/// One completed download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRecord {
    pub id: String,
    pub url: String,
    pub video_id: String,
    pub title: String,
    pub format: String,
    pub output_path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

impl DownloadRecord {
    pub fn from_outcome(url: &str, format: &str, outcome: &Outcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            video_id: outcome.metadata.id.clone(),
            title: outcome.metadata.title_or_fallback().to_string(),
            format: format.to_string(),
            output_path: outcome.path.clone(),
            downloaded_at: Utc::now(),
        }
    }
}

/// Aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: u64,
    pub by_format: BTreeMap<String, u64>,
}

/// Convert database row to download record
fn row_into_download_record(row: sqlx::sqlite::SqliteRow) -> Result<DownloadRecord, GrabberError> {
    Ok(DownloadRecord {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        video_id: row.try_get("video_id")?,
        title: row.try_get("title")?,
        format: row.try_get("format")?,
        output_path: PathBuf::from(row.try_get::<String, _>("output_path")?),
        downloaded_at: row.try_get("downloaded_at")?,
    })
}
