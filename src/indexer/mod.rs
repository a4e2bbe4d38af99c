// Indexer module
// Turns files into indexed chunks: load, split, skip duplicates, embed, store


use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, DuplicateCheck, IngestionConfig};
use crate::database::{Database, VectorStoreGateway};
use crate::embeddings::RecursiveSplitter;
use crate::loader::{SOURCE_KEY, load_document, source_name};
use crate::{DocQaError, Result};

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested { filename: String, chunks_added: usize },
    Duplicate { filename: String },
    Failed { path: PathBuf, reason: String },
}

impl IngestOutcome {
    #[inline]
    pub fn is_ingested(&self) -> bool {
        matches!(self, Self::Ingested { .. })
    }
}

impl fmt::Display for IngestOutcome {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingested {
                filename,
                chunks_added,
            } => write!(f, "Ingested '{}' with {} chunks.", filename, chunks_added),
            Self::Duplicate { filename } => write!(
                f,
                "File '{}' already exists in the vector store. Skipping ingestion.",
                filename
            ),
            Self::Failed { path, reason } => {
                write!(f, "Failed to ingest {}: {}", path.display(), reason)
            }
        }
    }
}

/// Ingestion service shared by the upload and ingest commands
pub struct Ingestor {
    splitter: RecursiveSplitter,
    ingestion: IngestionConfig,
    gateway: Arc<VectorStoreGateway>,
    ledger: Database,
}

impl Ingestor {
    #[inline]
    pub fn new(config: &Config, gateway: Arc<VectorStoreGateway>, ledger: Database) -> Self {
        Self {
            splitter: RecursiveSplitter::new(&config.chunking),
            ingestion: config.ingestion.clone(),
            gateway,
            ledger,
        }
    }

    #[inline]
    pub fn gateway(&self) -> &Arc<VectorStoreGateway> {
        &self.gateway
    }

    #[inline]
    pub fn ledger(&self) -> &Database {
        &self.ledger
    }

    /// Ingest one file. Never fails; problems are reported as
    /// [`IngestOutcome::Failed`].
    #[tracing::instrument(name = "file_ingestion", skip_all, fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path) -> IngestOutcome {
        match self.try_ingest_file(path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to ingest {}: {}", path.display(), e);
                IngestOutcome::Failed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_ingest_file(&self, path: &Path) -> Result<IngestOutcome> {
        let filename = source_name(path);

        if self.is_duplicate(&filename).await? {
            info!("File '{}' already exists in the vector store", filename);
            return Ok(IngestOutcome::Duplicate { filename });
        }

        let document = load_document(path)?;
        let mut chunks = self.splitter.chunk_segments(&document.segments);
        if chunks.is_empty() {
            return Err(DocQaError::Parse(format!(
                "No text content to index in {}",
                filename
            )));
        }
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert(SOURCE_KEY.to_string(), filename.clone());
        }

        let chunks_added = self.gateway.add(&chunks).await?;
        if let Err(e) = self.ledger.record_file(&filename, chunks_added).await {
            warn!(
                "'{}' has {} chunks in the index but no ledger record: {:#}",
                filename, chunks_added, e
            );
            return Err(DocQaError::Database(format!("{e:#}")));
        }

        info!("Ingested '{}' with {} chunks", filename, chunks_added);
        Ok(IngestOutcome::Ingested {
            filename,
            chunks_added,
        })
    }

    async fn is_duplicate(&self, filename: &str) -> Result<bool> {
        match self.ingestion.duplicate_check {
            DuplicateCheck::Sample => {
                let sample = self
                    .gateway
                    .sample(self.ingestion.duplicate_sample_size)
                    .await?;
                Ok(sample.iter().any(|chunk| chunk.source() == Some(filename)))
            }
            DuplicateCheck::Exact => {
                let recorded = self
                    .ledger
                    .get_file(filename)
                    .await
                    .map_err(|e| DocQaError::Database(format!("{e:#}")))?;
                if recorded.is_some() {
                    return Ok(true);
                }
                self.gateway.contains_source(filename).await
            }
        }
    }

    /// Ingest files in order; one failure does not stop the rest
    #[tracing::instrument(name = "batch_ingestion", skip_all, fields(files = paths.len()))]
    pub async fn ingest_files(&self, paths: &[PathBuf]) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            outcomes.push(self.ingest_file(path).await);
        }

        let ingested = outcomes.iter().filter(|o| o.is_ingested()).count();
        info!("Ingested {}/{} files", ingested, paths.len());
        outcomes
    }

    /// Ingest every regular file directly inside `dir`, in file-name order
    #[tracing::instrument(name = "directory_ingestion", skip_all, fields(dir = %dir.display()))]
    pub async fn ingest_directory(&self, dir: &Path) -> Result<Vec<IngestOutcome>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            } else {
                debug!("Skipping non-file entry {}", entry.path().display());
            }
        }
        paths.sort();

        Ok(self.ingest_files(&paths).await)
    }

    /// Wipe the index, staged uploads and the ledger
    #[inline]
    pub async fn reset(&self) -> Result<()> {
        self.gateway.reset().await?;
        let cleared = self
            .ledger
            .clear()
            .await
            .map_err(|e| DocQaError::Database(format!("{e:#}")))?;

        info!("Reset complete ({} ledger records removed)", cleared);
        Ok(())
    }
}
