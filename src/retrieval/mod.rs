
use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::index::FlatIndex;
use crate::{ChatError, Result};

/// A processed document set: the ordered chunk texts and the vector index
/// built over them, bound together so that index position `i` always
/// addresses chunk `i`.
///
/// The pair is immutable once built. Reprocessing documents builds a whole
/// new `DocumentSet` which then replaces the old one in a single reference
/// assignment; the two halves are never swapped independently.
#[derive(Debug, Clone)]
pub struct DocumentSet {
    chunks: Vec<String>,
    index: FlatIndex,
}

impl DocumentSet {
    #[inline]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Embed every chunk with document intent and build the index over them.
///
/// An empty chunk list is rejected before any provider call is made.
#[inline]
pub fn build_document_set(chunks: Vec<String>, embedder: &dyn Embedder) -> Result<DocumentSet> {
    if chunks.is_empty() {
        return Err(ChatError::Index(
            "no chunks to index; the documents yielded no text".to_string(),
        ));
    }

    let embeddings = embedder
        .embed_documents(&chunks)
        .map_err(|e| ChatError::Embedding(format!("{e:#}")))?;

    if embeddings.len() != chunks.len() {
        return Err(ChatError::Embedding(format!(
            "expected {} embeddings for {} chunks, got {}",
            chunks.len(),
            chunks.len(),
            embeddings.len()
        )));
    }

    let index = FlatIndex::build(embeddings)?;

    debug!(
        "Built document set: {} chunks, dimension {}",
        chunks.len(),
        index.dimension()
    );

    Ok(DocumentSet { chunks, index })
}

/// Return up to `top_k` chunk texts most relevant to `query`, nearest
/// first.
///
/// An empty query or an empty document set is a valid "nothing to search"
/// state and returns an empty list without touching the embedding
/// provider.
#[inline]
pub fn retrieve(
    documents: &DocumentSet,
    query: &str,
    embedder: &dyn Embedder,
    top_k: usize,
) -> Result<Vec<String>> {
    if query.trim().is_empty() || documents.is_empty() {
        return Ok(Vec::new());
    }

    let query_embedding = embedder
        .embed_query(query)
        .map_err(|e| ChatError::Embedding(format!("{e:#}")))?;

    let neighbors = documents.index.search(&query_embedding, top_k)?;

    // The index and chunk list are built as a pair, but stay defensive: a
    // position outside the chunk list is dropped rather than panicking.
    let mut results = Vec::with_capacity(neighbors.len());
    for neighbor in neighbors {
        match documents.chunks.get(neighbor.position) {
            Some(chunk) => results.push(chunk.clone()),
            None => warn!(
                "Search returned position {} outside the chunk list (len {})",
                neighbor.position,
                documents.chunks.len()
            ),
        }
    }

    Ok(results)
}
