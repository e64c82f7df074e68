pub mod cohere;

use anyhow::Result;

pub use cohere::CohereEmbedder;

/// Which side of the retrieval pipeline an embedding serves. Providers use
/// different internal representations for the two, so the intents must
/// never be interchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingIntent {
    /// A chunk being indexed.
    Document,
    /// A question being searched.
    Query,
}

impl EmbeddingIntent {
    /// Wire value for the provider's `input_type` field.
    #[inline]
    pub fn as_input_type(self) -> &'static str {
        match self {
            Self::Document => "search_document",
            Self::Query => "search_query",
        }
    }
}

/// Embedding backend seam. One vector per input text, all of equal
/// dimension, or the whole call fails.
pub trait Embedder {
    /// Embed chunk texts for indexing, preserving input order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a query string for searching.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
