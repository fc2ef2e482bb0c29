//! # DocTalk Providers
//!
//! HTTP clients for the pipeline's remote collaborators. One
//! OpenAI-compatible provider covers both roles: the [`Embedder`] used
//! during ingestion and queries, and the [`AnswerGenerator`] used after
//! retrieval.
//!
//! [`Embedder`]: doctalk_core::traits::Embedder
//! [`AnswerGenerator`]: doctalk_core::traits::AnswerGenerator

pub mod openai;

use std::sync::Arc;

use doctalk_core::config::DocTalkConfig;
use doctalk_core::error::Result;

pub use openai::OpenAiProvider;

/// Create the provider from configuration, shared between both roles.
pub fn create_provider(config: &DocTalkConfig) -> Result<Arc<OpenAiProvider>> {
    Ok(Arc::new(OpenAiProvider::from_config(config)?))
}
