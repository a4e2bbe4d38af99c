// Embeddings module
// Text splitting plus the embedding and language-model services the pipeline calls

pub mod chunking;
pub mod ollama;

pub use chunking::{Chunk, ChunkingConfig, RecursiveSplitter, estimate_token_count};
pub use ollama::{EmbeddingResult, OllamaClient};

use crate::Result;

/// Turns text into vectors for similarity search.
///
/// Implementations are synchronous; failures surface as
/// [`DocQaError::Embedding`](crate::DocQaError::Embedding).
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, preserving input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// A single-shot text completion model.
///
/// Failures surface as [`DocQaError::Model`](crate::DocQaError::Model).
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}
