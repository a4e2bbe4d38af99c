// Question answering over the indexed documents


use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::{SearchHit, VectorStoreGateway};
use crate::embeddings::LanguageModel;
use crate::{DocQaError, Result};

pub const FALLBACK_ANSWER: &str = "I don't know based on the document.";

pub const PROMPT_TEMPLATE: &str = "You are an expert assistant answering questions using only the context below.
If the answer is not contained in the context, say: \"I don't know based on the document.\"

Context:
{context}

Question:
{question}

Answer:";

const SNIPPET_CHARS: usize = 200;
const UNKNOWN_SOURCE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    pub source: String,
    pub snippet: String,
    pub score: Option<f64>,
}

impl SourceCitation {
    /// Basename of the chunk's source, a short single-line snippet, and the
    /// distance rounded to two decimals
    #[inline]
    pub fn from_hit(hit: &SearchHit) -> Self {
        let source = hit
            .chunk
            .source()
            .and_then(|s| Path::new(s).file_name())
            .map_or_else(
                || UNKNOWN_SOURCE.to_string(),
                |name| name.to_string_lossy().into_owned(),
            );

        let normalised = hit.chunk.content.split_whitespace().collect::<Vec<_>>().join(" ");
        let snippet = normalised.chars().take(SNIPPET_CHARS).collect();

        Self {
            source,
            snippet,
            score: hit.distance.map(|d| (f64::from(d) * 100.0).round() / 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

impl Answer {
    fn fallback() -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Build the grounded prompt from retrieved context and the question.
/// Placeholders are filled in one pass, so braces inside either value are
/// left alone.
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    let parts = PROMPT_TEMPLATE.split_once("{context}").and_then(|(head, tail)| {
        tail.split_once("{question}")
            .map(|(middle, end)| (head, middle, end))
    });

    match parts {
        Some((head, middle, end)) => format!("{head}{context}{middle}{question}{end}"),
        None => PROMPT_TEMPLATE.to_string(),
    }
}

/// Retrieval-augmented answering: search, prompt, one model call
pub struct Answerer {
    gateway: Arc<VectorStoreGateway>,
    llm: Arc<dyn LanguageModel>,
}

impl Answerer {
    #[inline]
    pub fn new(gateway: Arc<VectorStoreGateway>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { gateway, llm }
    }

    /// Answer `question` from the `k` most similar chunks. With no matching
    /// chunks the model is not called and the fallback answer is returned.
    #[tracing::instrument(name = "answer_question", skip(self))]
    pub async fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        let hits = self.gateway.similarity_search(question, k).await?;

        if hits.is_empty() {
            info!("No relevant chunks found, returning fallback answer");
            return Ok(Answer::fallback());
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(&context, question);
        debug!("Prompting with {} chunks of context", hits.len());

        let llm = Arc::clone(&self.llm);
        let answer = tokio::task::spawn_blocking(move || llm.complete(&prompt))
            .await
            .map_err(|e| DocQaError::Model(format!("Completion task failed: {}", e)))??;

        Ok(Answer {
            answer,
            sources: hits.iter().map(SourceCitation::from_hit).collect(),
        })
    }
}
