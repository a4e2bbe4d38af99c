#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::DocQaError;
use crate::config::Config;
use crate::embeddings::chunking::estimate_token_count;
use crate::embeddings::{Embedder, LanguageModel};

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    chat_model: String,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub text: String,
    pub embedding: Vec<f32>,
    pub token_count: usize,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.ollama.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.ollama.embedding_model.clone(),
            chat_model: config.ollama.chat_model.clone(),
            batch_size: config.ollama.batch_size,
            agent,
            retry_attempts: config.ollama.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Test connection to Ollama server and verify both models are available
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping().context("Server ping failed")?;
        self.validate_models().context("Model validation failed")?;

        info!(
            "Health check passed for Ollama server at {} (embeddings: {}, chat: {})",
            self.base_url, self.embedding_model, self.chat_model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build ping URL")?;

        debug!("Pinging Ollama server at {}", url);

        self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping Ollama server")?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured models are available
    #[inline]
    pub fn validate_models(&self) -> Result<()> {
        let models = self.list_models().context("Failed to list models")?;

        for wanted in [&self.embedding_model, &self.chat_model] {
            if !models.iter().any(|m| &m.name == wanted) {
                let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    wanted, available_models
                );
                return Err(anyhow::anyhow!(
                    "Model '{}' is not available. Available models: {:?}",
                    wanted,
                    available_models
                ));
            }
        }

        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate an embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<EmbeddingResult> {
        let input = [text.to_string()];
        self.generate_embeddings_single_batch(&input)?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding response was empty"))
    }

    /// Generate embeddings for multiple text inputs using batch processing
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        // Process in batches to avoid overwhelming the server
        for chunk in texts.chunks(self.batch_size.max(1) as usize) {
            let batch_results = self
                .generate_embeddings_single_batch(chunk)
                .with_context(|| format!("Failed to process batch of {} texts", chunk.len()))?;

            results.extend(batch_results);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            ));
        }

        let results = texts
            .iter()
            .zip(response.embeddings)
            .map(|(text, embedding)| EmbeddingResult {
                text: text.clone(),
                embedding,
                token_count: estimate_token_count(text),
            })
            .collect();

        Ok(results)
    }

    /// Ask the chat model for a single deterministic, non-streamed reply
    #[inline]
    pub fn generate_completion(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} (prompt ~{} tokens)",
            self.chat_model,
            estimate_token_count(prompt)
        );

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let url = self
            .base_url
            .join("/api/chat")
            .context("Failed to build chat URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate completion")?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        Ok(response.message.content)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All request attempts failed for {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

impl Embedder for OllamaClient {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        self.generate_embedding(text)
            .map(|result| result.embedding)
            .map_err(|e| DocQaError::Embedding(format!("{e:#}")))
    }

    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.generate_embeddings_batch(texts)
            .map(|results| results.into_iter().map(|r| r.embedding).collect())
            .map_err(|e| DocQaError::Embedding(format!("{e:#}")))
    }
}

impl LanguageModel for OllamaClient {
    fn complete(&self, prompt: &str) -> crate::Result<String> {
        self.generate_completion(prompt)
            .map_err(|e| DocQaError::Model(format!("{e:#}")))
    }
}
