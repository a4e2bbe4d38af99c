// Database module
// LanceDB holds the chunk index, SQLite holds the ingestion ledger

pub mod lancedb;
pub mod sqlite;

pub use self::lancedb::{EmbeddingRecord, SearchHit, VectorStoreGateway};
pub use sqlite::Database;
pub use sqlite::models::IngestedFile;
