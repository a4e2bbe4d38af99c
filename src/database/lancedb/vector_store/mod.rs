#[cfg(test)]
mod tests;

use super::EmbeddingRecord;
use crate::{DocQaError, Result};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TABLE_NAME: &str = "chunks";

/// A stored row as read back from LanceDB
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub content: String,
    pub source: String,
    /// JSON-encoded chunk metadata
    pub metadata: String,
    pub distance: Option<f32>,
}

/// Thin wrapper over a LanceDB connection holding the `chunks` table
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: usize,
}

impl VectorStore {
    /// Open (or create) the store at `db_path`. A new table is created with
    /// `default_dimension`; an existing table keeps its own dimension.
    #[inline]
    pub async fn open(db_path: &Path, default_dimension: usize) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            DocQaError::Index(format!("Failed to create vector store directory: {}", e))
        })?;

        let uri = db_path.display().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: default_dimension,
        };
        store.initialize_table().await?;

        info!(
            "Vector store ready at {:?} ({} dimensions)",
            db_path, store.vector_dimension
        );
        Ok(store)
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    async fn initialize_table(&mut self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            self.vector_dimension = self.detect_existing_vector_dimension().await?;
            debug!(
                "Existing {} table has {} dimensions",
                self.table_name, self.vector_dimension
            );
            return Ok(());
        }

        self.create_table(self.vector_dimension).await
    }

    async fn create_table(&self, vector_dim: usize) -> Result<()> {
        self.connection
            .create_empty_table(&self.table_name, create_schema(vector_dim))
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Created {} table with {} dimensions",
            self.table_name, vector_dim
        );
        Ok(())
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                DocQaError::Index("Could not find vector column or determine dimension".to_string())
            })
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to open table: {}", e)))
    }

    /// Insert records. A dimension different from the table's is only
    /// accepted while the table is still empty, in which case the table is
    /// recreated.
    #[inline]
    pub async fn insert(&mut self, records: &[EmbeddingRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            debug!("No embeddings to store");
            return Ok(());
        };

        let vector_dim = first.vector.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(DocQaError::Index(format!(
                "Inconsistent vector dimensions in batch: {} vs {}",
                vector_dim,
                bad.vector.len()
            )));
        }

        if vector_dim != self.vector_dimension {
            let existing = self.count().await?;
            if existing > 0 {
                return Err(DocQaError::Index(format!(
                    "Embedding dimension {} does not match the index dimension {} ({} records stored)",
                    vector_dim, self.vector_dimension, existing
                )));
            }

            warn!(
                "Vector dimension changed from {} to {}, recreating empty table",
                self.vector_dimension, vector_dim
            );
            self.drop_table_if_exists().await?;
            self.create_table(vector_dim).await?;
            self.vector_dimension = vector_dim;
        }

        let record_batch = self.create_record_batch(records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to insert embeddings: {}", e)))?;

        debug!("Stored {} embeddings", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let vector_dim = self.vector_dimension;

        let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| DocQaError::Index(format!("Failed to create vector array: {}", e)))?;

        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut metadata = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            contents.push(record.content.as_str());
            sources.push(record.source.as_str());
            metadata.push(record.metadata.as_str());
            created_ats.push(record.created_at.as_str());
        }

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(create_schema(vector_dim), arrays)
            .map_err(|e| DocQaError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// Nearest neighbours of `query_vector`, closest first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<StoredRow>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector)
            .map_err(|e| DocQaError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to execute search: {}", e)))?;

        let mut rows = collect_rows(results).await?;
        rows.sort_by(|a, b| {
            a.distance
                .unwrap_or(f32::MAX)
                .total_cmp(&b.distance.unwrap_or(f32::MAX))
        });
        Ok(rows)
    }

    /// Up to `limit` rows in storage order, without a vector query
    #[inline]
    pub async fn sample(&self, limit: usize) -> Result<Vec<StoredRow>> {
        let table = self.open_table().await?;
        let results = table
            .query()
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to execute scan: {}", e)))?;

        collect_rows(results).await
    }

    #[inline]
    pub async fn count_source(&self, source: &str) -> Result<u64> {
        let table = self.open_table().await?;
        let predicate = format!("source = '{}'", source.replace('\'', "''"));
        let count = table
            .count_rows(Some(predicate))
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| DocQaError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names =
            self.connection.table_names().execute().await.map_err(|e| {
                DocQaError::Index(format!("Failed to list tables for drop: {}", e))
            })?;

        if table_names.contains(&self.table_name) {
            info!("Dropping {} table", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| DocQaError::Index(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

async fn collect_rows(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> Result<Vec<StoredRow>> {
    let mut rows = Vec::new();

    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| DocQaError::Index(format!("Failed to read result stream: {}", e)))?
    {
        rows.extend(parse_batch(&batch)?);
    }

    Ok(rows)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DocQaError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DocQaError::Index(format!("Invalid {} column type", name)))
}

fn parse_batch(batch: &RecordBatch) -> Result<Vec<StoredRow>> {
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let metadata = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let rows = (0..batch.num_rows())
        .map(|row| StoredRow {
            content: contents.value(row).to_string(),
            source: sources.value(row).to_string(),
            metadata: metadata.value(row).to_string(),
            distance: distances.and_then(|d| (!d.is_null(row)).then(|| d.value(row))),
        })
        .collect();

    Ok(rows)
}
