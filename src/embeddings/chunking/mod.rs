#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::loader::{Metadata, Segment};

/// Metadata key holding the position of a chunk within its document
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Boundaries tried in order: paragraph, line, sentence, word, character
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Represents a chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// Metadata inherited from the source segment
    pub metadata: Metadata,
}

impl Chunk {
    /// The `source` metadata value, if present
    #[inline]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(crate::loader::SOURCE_KEY).map(String::as_str)
    }
}

/// Configuration for content chunking. Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Splits text at the largest natural boundary that keeps pieces under
/// `chunk_size`, then merges pieces into overlapping windows.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl RecursiveSplitter {
    /// Build a splitter; the overlap is clamped below the chunk size so every
    /// window makes progress.
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Chunk every segment, propagating its metadata and numbering the chunks
    /// in document order.
    #[inline]
    pub fn chunk_segments(&self, segments: &[Segment]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for segment in segments {
            for content in self.split_text(&segment.content) {
                let mut metadata = segment.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), chunks.len().to_string());
                chunks.push(Chunk { content, metadata });
            }
        }

        debug!(
            "Chunked {} segments into {} chunks (avg {} tokens)",
            segments.len(),
            chunks.len(),
            chunks
                .iter()
                .map(|c| estimate_token_count(&c.content))
                .sum::<usize>()
                / chunks.len().max(1)
        );

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map_or((separators.len(), ""), |(i, sep)| (i, *sep));
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.split_inclusive(|_: char| true).collect()
        } else {
            text.split_inclusive(separator)
                .filter(|p| !p.is_empty())
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    /// Greedily pack pieces into windows of at most `chunk_size` characters,
    /// keeping up to `chunk_overlap` characters of trailing pieces as the start
    /// of the next window.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut merged, &window);

                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_trimmed(&mut merged, &window);
        merged
    }
}

impl Default for RecursiveSplitter {
    #[inline]
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

fn push_trimmed(out: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
