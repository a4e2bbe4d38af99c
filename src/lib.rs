use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocQaError>;

#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod loader;
pub mod qa;
pub mod uploads;

#[cfg(test)]
mod test_support;
