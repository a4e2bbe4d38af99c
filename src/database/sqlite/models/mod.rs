#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the ingestion ledger: a file whose chunks are in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IngestedFile {
    pub id: i64,
    pub filename: String,
    pub chunk_count: i64,
    pub ingested_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngestedFile {
    pub filename: String,
    pub chunk_count: i64,
}

impl NewIngestedFile {
    #[inline]
    pub fn new(filename: impl Into<String>, chunk_count: usize) -> Self {
        Self {
            filename: filename.into(),
            chunk_count: i64::try_from(chunk_count).unwrap_or(i64::MAX),
        }
    }
}

impl std::fmt::Display for IngestedFile {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} chunks, {})",
            self.filename,
            self.chunk_count,
            self.ingested_date.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
