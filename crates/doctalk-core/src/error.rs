//! Error taxonomy for the DocTalk pipeline.
//!
//! Every error here is terminal for the current request: the core never
//! retries collaborator calls and never falls back to a degraded answer.

use thiserror::Error;

/// What an embedding call was for, so a failure is attributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTarget {
    /// Embedding of the passage with this ordinal, during ingestion.
    Passage(usize),
    /// Embedding of the user's question, during a query.
    Query,
}

impl std::fmt::Display for EmbedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedTarget::Passage(ordinal) => write!(f, "passage {ordinal}"),
            EmbedTarget::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocTalkError {
    /// The document produced zero non-empty passages.
    #[error("document contains no extractable passages")]
    EmptyDocument,

    /// PDF (or other source) text extraction failed.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    /// An embedding call failed; `target` names the passage ordinal or the query.
    #[error("embedding failed for {target}: {reason}")]
    EmbeddingFailure { target: EmbedTarget, reason: String },

    /// A vector's length differs from the dimensionality the rest of the
    /// index (or the query) uses. An integrity violation, not a user error.
    #[error("vector dimension mismatch: expected {expected} dims, record '{record_id}' has {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        record_id: String,
    },

    /// Every retrieved match had empty text; nothing to hand to the generator.
    #[error("no relevant context found in the document")]
    NoRelevantContext,

    /// Answer generation failed.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// Unknown document id.
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocTalkError>;
