//! Embedding-store boundary
//!
//! The retrieval stack downstream of this crate consumes converted text as
//! `(text, metadata)` chunks. Only the interface lives here; index
//! construction and similarity scoring are external collaborators.

use std::collections::HashMap;

/// A chunk of converted text plus its provenance metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text
    pub text: String,
    /// Provenance (source address, title, position, ...)
    pub metadata: HashMap<String, String>,
}

/// A chunk ranked by similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: TextChunk,
    /// Similarity score, higher is closer
    pub score: f32,
}

/// External store of embedded chunks with similarity search
pub trait EmbeddingStore {
    /// Error type surfaced by the store
    type Error;

    /// Add chunks to the index
    fn add_chunks(&mut self, chunks: Vec<TextChunk>) -> Result<(), Self::Error>;

    /// Return the `k` chunks closest to `query`, best first
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, Self::Error>;
}
