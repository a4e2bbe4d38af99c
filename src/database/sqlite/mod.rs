use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::sqlite::models::{IngestedFile, NewIngestedFile};
use crate::database::sqlite::queries::IngestedFileQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// The ingestion ledger: which files have been indexed and with how many chunks
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Open `<base_dir>/metadata.db`, creating the base directory if needed
    pub async fn initialize_from_config(config: &Config) -> Result<Self> {
        let base_dir = config.get_base_dir();
        std::fs::create_dir_all(base_dir).with_context(|| {
            format!("Failed to create base directory: {}", base_dir.display())
        })?;

        Self::new(config.database_path()).await
    }

    pub async fn record_file(&self, filename: &str, chunk_count: usize) -> Result<IngestedFile> {
        IngestedFileQueries::upsert(&self.pool, NewIngestedFile::new(filename, chunk_count)).await
    }

    pub async fn get_file(&self, filename: &str) -> Result<Option<IngestedFile>> {
        IngestedFileQueries::get_by_filename(&self.pool, filename).await
    }

    pub async fn list_files(&self) -> Result<Vec<IngestedFile>> {
        IngestedFileQueries::list_all(&self.pool).await
    }

    pub async fn clear(&self) -> Result<u64> {
        IngestedFileQueries::delete_all(&self.pool).await
    }
}
