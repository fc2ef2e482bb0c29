//! Trait seams between the retrieval core and its collaborators.
//!
//! The pipeline only ever sees these traits, so every external service —
//! embeddings API, chat API, PDF parser, database — can be swapped for a
//! test double.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::DocumentIndex;

/// Maps text to a fixed-length embedding vector.
///
/// All calls within one pipeline must use the same model, so every returned
/// vector has the same length.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generates the final answer from a system prompt (carrying the retrieved
/// context) and the user's question.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, question: &str) -> Result<String>;
}

/// Extracts plain text from raw document bytes. Synchronous CPU-bound work.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Durable storage for document indexes.
///
/// `save` must be all-or-nothing: a failed save leaves no partial index
/// behind. Stored indexes are immutable and safe for concurrent reads.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, index: &DocumentIndex) -> Result<()>;
    async fn find_by_id(&self, document_id: &str) -> Result<Option<DocumentIndex>>;
    /// All stored documents as `(document_id, file_name)`, newest first.
    async fn list(&self) -> Result<Vec<(String, String)>>;
}
