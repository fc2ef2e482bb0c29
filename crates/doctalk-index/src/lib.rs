//! # DocTalk Index
//!
//! The retrieval core: chunking policy, cosine-similarity ranking, and the
//! pipeline that ties chunker, embedder, and store together.
//!
//! ```text
//! ingest:  raw text ─▶ chunker ─▶ embed (bounded fan-out) ─▶ DocumentIndex ─▶ store
//! query:   question ─▶ embed ─▶ rank (exact cosine) ─▶ top-k context
//! ```

pub mod chunker;
pub mod pipeline;
pub mod ranker;

pub use pipeline::{RetrievalPipeline, system_prompt};
pub use ranker::{cosine_similarity, rank};
