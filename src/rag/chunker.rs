//! Sliding-window chunking of extracted document text.
//!
//! Chunk `n` starts at `n * (chunk_size - overlap)` characters and spans up to
//! `chunk_size` characters. The window stops once a chunk reaches the end of
//! the text, so every character lands in at least one chunk and consecutive
//! chunks share exactly `overlap` characters.

use serde::{Deserialize, Serialize};

/// Window parameters for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared with the previous chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

impl ChunkingConfig {
    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

/// A contiguous slice of one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{source}_{start_offset}`
    pub id: String,
    pub content: String,
    /// Originating document file name.
    pub source: String,
    /// Character offset of the chunk in the extracted text.
    pub start_offset: usize,
}

/// Builds the deterministic chunk identifier.
pub fn chunk_id(source: &str, start_offset: usize) -> String {
    format!("{}_{}", source, start_offset)
}

/// Splits `text` into overlapping chunks attributed to `source`.
pub fn split_into_chunks(text: &str, source: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();
    let chunk_size = config.chunk_size.max(1);
    let step = config.step();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        chunks.push(Chunk {
            id: chunk_id(source, start),
            content: chars[start..end].iter().collect(),
            source: source.to_string(),
            start_offset: start,
        });

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}
