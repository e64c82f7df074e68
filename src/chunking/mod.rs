
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ChatError, Result};

/// Configuration for splitting extracted text into overlapping chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks. Must be smaller than
    /// `chunk_size` so the cursor always advances.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 300,
        }
    }
}

impl ChunkingConfig {
    /// Cursor advance between consecutive chunks.
    #[inline]
    pub fn stride(&self) -> Result<usize> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChatError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(self.chunk_size - self.chunk_overlap)
    }
}

/// Split text into overlapping chunks, preferring sentence and line
/// boundaries over hard cuts.
///
/// Scans left to right taking windows of up to `chunk_size` characters.
/// When a window ends strictly inside the text, the cut is moved back to
/// the last sentence terminator or line break found in the second half of
/// the window. Chunks are trimmed and empty ones discarded; the cursor
/// advances by `chunk_size - chunk_overlap` each iteration.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let stride = config.stride()?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Windows are measured in characters, not bytes, so cuts always land on
    // valid boundaries regardless of the input script.
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + config.chunk_size).min(total);

        if end < total {
            if let Some(offset) = chars[start..end]
                .iter()
                .rposition(|c| matches!(c, '.' | '!' | '?' | '\n'))
            {
                let break_pos = start + offset;
                // Only accept the boundary if it falls in the second half of
                // the window; an earlier cut would degrade overlap coverage.
                if break_pos > start + config.chunk_size / 2 {
                    end = break_pos + 1;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start += stride;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
