//! Core data types for ingestion and retrieval.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One chunk of document text, as produced by the chunker.
///
/// Ordinals are dense 0-based positions in the surviving chunk sequence —
/// segments dropped for being empty do not leave gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub ordinal: usize,
}

/// A passage plus its embedding, as stored in a [`DocumentIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique within the document: `"{document_id}_{ordinal}"`.
    pub id: String,
    /// Embedding vector. All records in one index share one dimensionality.
    pub values: Vec<f32>,
    pub text: String,
    pub document_id: String,
    pub file_name: String,
}

impl VectorRecord {
    /// Derive the deterministic record id for a passage of a document.
    pub fn derive_id(document_id: &str, ordinal: usize) -> String {
        format!("{document_id}_{ordinal}")
    }

    /// The passage ordinal, recovered from the id suffix.
    ///
    /// Records are only ever built through [`VectorRecord::derive_id`], so the
    /// suffix is always present; a malformed id sorts as ordinal 0.
    pub fn ordinal(&self) -> usize {
        self.id
            .rsplit('_')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

/// All retrieval state for one ingested document. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentIndex {
    pub document_id: String,
    pub file_name: String,
    /// Records in passage order (ascending ordinal).
    pub records: Vec<VectorRecord>,
}

impl DocumentIndex {
    /// Embedding dimensionality of this index, or `None` when empty.
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(|r| r.values.len())
    }
}

/// Generate a fresh document id: `doc_{unix_millis}_{8 hex}`.
///
/// The timestamp keeps ids roughly sortable by ingestion time; the random
/// suffix makes collisions negligible even for ingestions within one
/// millisecond.
pub fn new_document_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().r#gen();
    format!("doc_{millis}_{suffix:08x}")
}

/// One retrieval hit. Ephemeral — produced per query, never persisted.
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub record: VectorRecord,
    /// Cosine similarity to the query vector, in [-1, 1].
    pub score: f32,
}

impl RankedMatch {
    /// Citation line for display next to the answer.
    pub fn citation(&self) -> String {
        format!("From: {}", self.record.file_name)
    }
}

/// Result of the query path: the context string for the generator plus the
/// matches it was built from.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub context: String,
    pub matches: Vec<RankedMatch>,
}
