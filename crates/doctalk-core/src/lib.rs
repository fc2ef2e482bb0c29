//! # DocTalk Core
//!
//! Shared types, configuration, errors, and the trait seams between the
//! retrieval pipeline and its collaborators (embeddings API, chat API,
//! PDF extraction, document store).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DocTalkConfig;
pub use error::{DocTalkError, EmbedTarget, Result};
pub use types::{DocumentIndex, Passage, QueryOutcome, RankedMatch, VectorRecord};
