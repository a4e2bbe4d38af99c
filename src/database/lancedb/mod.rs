// LanceDB vector database module
// Lazily opened chunk index shared by ingestion and answering


pub mod vector_store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embeddings::{Chunk, Embedder};
use crate::loader::{Metadata, SOURCE_KEY};
use crate::uploads::{UploadStore, remove_dir_if_exists};
use crate::{DocQaError, Result};
use vector_store::{StoredRow, VectorStore};

/// Row stored in LanceDB for every chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// UUID v4
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    /// Basename of the originating file
    pub source: String,
    /// JSON-encoded chunk metadata
    pub metadata: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl EmbeddingRecord {
    #[inline]
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Result<Self> {
        let metadata = serde_json::to_string(&chunk.metadata)
            .map_err(|e| DocQaError::Index(format!("Failed to encode chunk metadata: {}", e)))?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            content: chunk.content.clone(),
            source: chunk.source().unwrap_or_default().to_string(),
            metadata,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// A retrieved chunk with its distance from the query (lower is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: Option<f32>,
}

/// Shared access point to the chunk index.
///
/// The LanceDB handle is opened on first use and kept behind an async mutex,
/// so concurrent first calls initialise it once. `reset` wipes the index and
/// the upload staging directory; the next call starts from an empty index.
pub struct VectorStoreGateway {
    db_path: PathBuf,
    embedding_dimension: usize,
    embedder: Arc<dyn Embedder>,
    uploads: UploadStore,
    store: Mutex<Option<VectorStore>>,
}

impl VectorStoreGateway {
    #[inline]
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            db_path: config.vector_store_path(),
            embedding_dimension: config.ollama.embedding_dimension as usize,
            embedder,
            uploads: UploadStore::from_config(config),
            store: Mutex::new(None),
        }
    }

    async fn ensure_open<'a>(
        &self,
        slot: &'a mut Option<VectorStore>,
    ) -> Result<&'a mut VectorStore> {
        if slot.is_none() {
            *slot = Some(VectorStore::open(&self.db_path, self.embedding_dimension).await?);
        }

        slot.as_mut()
            .ok_or_else(|| DocQaError::Index("Vector store handle unavailable".to_string()))
    }

    /// Open the index, creating it if it does not exist yet
    #[inline]
    pub async fn get_or_create(&self) -> Result<()> {
        let mut guard = self.store.lock().await;
        self.ensure_open(&mut guard).await?;
        Ok(())
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| DocQaError::Embedding(format!("Embedding task failed: {}", e)))?
    }

    /// Embed and store chunks, returning how many were added
    #[inline]
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embed(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(DocQaError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector))
            .collect::<Result<Vec<_>>>()?;

        let mut guard = self.store.lock().await;
        let store = self.ensure_open(&mut guard).await?;
        store.insert(&records).await?;

        debug!("Added {} chunks to the index", records.len());
        Ok(records.len())
    }

    /// Up to `k` stored chunks closest to `query`, closest first
    #[inline]
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| DocQaError::Embedding("Query embedding was empty".to_string()))?;

        let mut guard = self.store.lock().await;
        let store = self.ensure_open(&mut guard).await?;
        if store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let rows = store.search(&query_vector, k).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let distance = row.distance;
                SearchHit {
                    chunk: row_to_chunk(row),
                    distance,
                }
            })
            .collect())
    }

    /// A bounded, unordered sample of stored chunks
    #[inline]
    pub async fn sample(&self, limit: usize) -> Result<Vec<Chunk>> {
        let mut guard = self.store.lock().await;
        let store = self.ensure_open(&mut guard).await?;
        let rows = store.sample(limit).await?;
        Ok(rows.into_iter().map(row_to_chunk).collect())
    }

    /// Whether any stored chunk has exactly this `source`
    #[inline]
    pub async fn contains_source(&self, source: &str) -> Result<bool> {
        let mut guard = self.store.lock().await;
        let store = self.ensure_open(&mut guard).await?;
        Ok(store.count_source(source).await? > 0)
    }

    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let mut guard = self.store.lock().await;
        let store = self.ensure_open(&mut guard).await?;
        store.count().await
    }

    #[inline]
    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Drop the handle, delete the index directory and staged uploads
    #[inline]
    pub async fn reset(&self) -> Result<()> {
        let mut guard = self.store.lock().await;
        guard.take();

        remove_dir_if_exists(&self.db_path)
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to delete vector store: {}", e)))?;
        self.uploads.clear().await?;

        info!("Vector store and uploads reset");
        Ok(())
    }
}

fn row_to_chunk(row: StoredRow) -> Chunk {
    let mut metadata: Metadata = serde_json::from_str(&row.metadata).unwrap_or_else(|e| {
        warn!("Ignoring unreadable chunk metadata: {}", e);
        Metadata::new()
    });
    metadata.insert(SOURCE_KEY.to_string(), row.source);

    Chunk {
        content: row.content,
        metadata,
    }
}
