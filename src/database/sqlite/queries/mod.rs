
use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

pub struct IngestedFileQueries;

impl IngestedFileQueries {
    /// Insert a ledger row, replacing the chunk count and date if the file
    /// was recorded before
    #[inline]
    pub async fn upsert(pool: &SqlitePool, new_file: NewIngestedFile) -> Result<IngestedFile> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO ingested_files (filename, chunk_count, ingested_date)
            VALUES (?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                chunk_count = excluded.chunk_count,
                ingested_date = excluded.ingested_date
            "#,
        )
        .bind(&new_file.filename)
        .bind(new_file.chunk_count)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to record ingested file")?;

        Self::get_by_filename(pool, &new_file.filename)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve recorded file"))
    }

    #[inline]
    pub async fn get_by_filename(pool: &SqlitePool, filename: &str) -> Result<Option<IngestedFile>> {
        let result = sqlx::query_as::<_, IngestedFile>(
            "SELECT id, filename, chunk_count, ingested_date FROM ingested_files WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(pool)
        .await
        .context("Failed to get ingested file by name")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<IngestedFile>> {
        let files = sqlx::query_as::<_, IngestedFile>(
            "SELECT id, filename, chunk_count, ingested_date FROM ingested_files ORDER BY filename",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list ingested files")?;

        Ok(files)
    }

    #[inline]
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM ingested_files")
            .execute(pool)
            .await
            .context("Failed to clear ingested files")?
            .rows_affected();

        debug!("Deleted {} ingested file records", deleted);
        Ok(deleted)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingested_files")
            .fetch_one(pool)
            .await
            .context("Failed to count ingested files")?;

        Ok(count)
    }
}
