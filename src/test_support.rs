// Shared fakes for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::config::{Config, OllamaConfig};
use crate::embeddings::{Embedder, LanguageModel};
use crate::{DocQaError, Result};

pub const TEST_DIMENSION: u32 = 4;

/// Embeds text as keyword counts over a fixed vocabulary plus a bias term,
/// so nearest neighbours are predictable.
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub const VOCABULARY: [&'static str; 3] = ["langchain", "rust", "ocean"];

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = Self::VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(1.0);
        Ok(vector)
    }
}

#[derive(Debug, Default)]
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(DocQaError::Embedding("embedding service unavailable".to_string()))
    }
}

/// Counts calls and always fails
#[derive(Debug, Default)]
pub struct FailingModel {
    pub calls: AtomicUsize,
}

impl FailingModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for FailingModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DocQaError::Model("model returned status 500".to_string()))
    }
}

/// Returns a canned reply and records every prompt it receives
#[derive(Debug)]
pub struct RecordingModel {
    pub reply: String,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock should not be poisoned").clone()
    }
}

impl LanguageModel for RecordingModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock should not be poisoned")
            .push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub fn test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        ollama: OllamaConfig {
            embedding_dimension: TEST_DIMENSION,
            ..OllamaConfig::default()
        },
        ..Config::with_base_dir(temp_dir.path())
    };
    (config, temp_dir)
}

pub fn keyword_embedder() -> Arc<KeywordEmbedder> {
    Arc::new(KeywordEmbedder::default())
}

pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}
