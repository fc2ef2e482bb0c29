//! The retrieval pipeline: ingest (chunk → embed → persist) and query
//! (embed → rank → assemble context).

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use doctalk_core::error::{DocTalkError, EmbedTarget, Result};
use doctalk_core::traits::{DocumentStore, Embedder};
use doctalk_core::types::{DocumentIndex, QueryOutcome, VectorRecord, new_document_id};

use crate::{chunker, ranker};

/// Orchestrates ingestion and querying over injected collaborators.
pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    /// Fan-out bound for passage embedding during ingestion.
    max_concurrent: usize,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Ingest a document's extracted text: chunk, embed every passage, and
    /// persist the resulting index atomically.
    ///
    /// Embedding calls run concurrently, at most `max_concurrent` in flight.
    /// The fan-in is all-or-nothing: the first failed call aborts the rest
    /// (in-flight calls are dropped) and surfaces an `EmbeddingFailure`
    /// naming the passage ordinal. Nothing is written to the store unless
    /// every passage embedded.
    pub async fn ingest(&self, raw_text: &str, file_name: &str) -> Result<DocumentIndex> {
        let passages = chunker::chunk(raw_text)?;
        let document_id = new_document_id();
        tracing::info!(
            document_id = %document_id,
            file_name,
            passages = passages.len(),
            "ingesting document"
        );

        // buffered() keeps results in passage order and bounds concurrency;
        // try_collect() drops the stream on the first error, which cancels
        // whatever is still in flight.
        let embeddings: Vec<Vec<f32>> = stream::iter(passages.iter().map(|passage| {
            let embedder = Arc::clone(&self.embedder);
            let ordinal = passage.ordinal;
            let text = passage.text.clone();
            async move {
                embedder
                    .embed(&text)
                    .await
                    .map_err(|e| DocTalkError::EmbeddingFailure {
                        target: EmbedTarget::Passage(ordinal),
                        reason: e.to_string(),
                    })
            }
        }))
        .buffered(self.max_concurrent)
        .try_collect()
        .await?;

        // One model produced all vectors, so lengths must agree. Catching a
        // divergence here keeps the index invariant out of the store.
        if let Some(expected) = embeddings.first().map(Vec::len) {
            for (passage, values) in passages.iter().zip(&embeddings) {
                if values.len() != expected {
                    return Err(DocTalkError::DimensionMismatch {
                        expected,
                        found: values.len(),
                        record_id: VectorRecord::derive_id(&document_id, passage.ordinal),
                    });
                }
            }
        }

        let records: Vec<VectorRecord> = passages
            .into_iter()
            .zip(embeddings)
            .map(|(passage, values)| VectorRecord {
                id: VectorRecord::derive_id(&document_id, passage.ordinal),
                values,
                text: passage.text,
                document_id: document_id.clone(),
                file_name: file_name.to_string(),
            })
            .collect();

        let index = DocumentIndex {
            document_id,
            file_name: file_name.to_string(),
            records,
        };
        self.store.save(&index).await?;
        Ok(index)
    }

    /// Answer-retrieval path: embed the question, rank the index, and build
    /// the context string for the generator.
    ///
    /// Matches whose text is empty after trimming are excluded from the
    /// context; if nothing remains, fails with `NoRelevantContext` so the
    /// caller never requests an answer from an empty context.
    pub async fn query(
        &self,
        question: &str,
        index: &DocumentIndex,
        k: usize,
    ) -> Result<QueryOutcome> {
        let query_vector =
            self.embedder
                .embed(question)
                .await
                .map_err(|e| DocTalkError::EmbeddingFailure {
                    target: EmbedTarget::Query,
                    reason: e.to_string(),
                })?;

        let matches = ranker::rank(&query_vector, index, k)?;

        let context = matches
            .iter()
            .map(|m| m.record.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if context.is_empty() {
            return Err(DocTalkError::NoRelevantContext);
        }

        tracing::debug!(
            document_id = %index.document_id,
            matches = matches.len(),
            top_score = matches.first().map(|m| m.score).unwrap_or(0.0),
            "retrieved context"
        );
        Ok(QueryOutcome { context, matches })
    }

    /// Like [`query`](Self::query), but resolves the index from the store.
    pub async fn query_document(
        &self,
        question: &str,
        document_id: &str,
        k: usize,
    ) -> Result<QueryOutcome> {
        let index = self
            .store
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| DocTalkError::NotFound(document_id.to_string()))?;
        self.query(question, &index, k).await
    }
}

/// System prompt handed to the answer generator alongside the question.
pub fn system_prompt(context: &str) -> String {
    format!(
        "You are a helpful assistant. Answer the question based on the following context:\n{context}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embedder returning fixed vectors per text; unknown text fails.
    struct KeyedEmbedder {
        table: Vec<(&'static str, Vec<f32>)>,
    }

    #[async_trait]
    impl Embedder for KeyedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.table
                .iter()
                .find(|(key, _)| *key == text)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| DocTalkError::Provider(format!("no embedding for '{text}'")))
        }
    }

    /// Store that records saves in memory.
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<DocumentIndex>>,
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn save(&self, index: &DocumentIndex) -> Result<()> {
            self.saved.lock().unwrap().push(index.clone());
            Ok(())
        }

        async fn find_by_id(&self, document_id: &str) -> Result<Option<DocumentIndex>> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .find(|i| i.document_id == document_id)
                .cloned())
        }

        async fn list(&self) -> Result<Vec<(String, String)>> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .map(|i| (i.document_id.clone(), i.file_name.clone()))
                .collect())
        }
    }

    fn pipeline_with(
        table: Vec<(&'static str, Vec<f32>)>,
    ) -> (RetrievalPipeline, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let pipeline = RetrievalPipeline::new(
            Arc::new(KeyedEmbedder { table }),
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            4,
        );
        (pipeline, store)
    }

    #[tokio::test]
    async fn ingest_round_trip_derives_ids_from_ordinals() {
        let (pipeline, store) = pipeline_with(vec![
            ("Alpha line.", vec![1.0, 0.0]),
            ("Beta line.", vec![0.0, 1.0]),
            ("Gamma line.", vec![0.5, 0.5]),
        ]);

        let index = pipeline
            .ingest("Alpha line.\n\nBeta line.\n\nGamma line.", "essay.pdf")
            .await
            .unwrap();

        assert_eq!(index.records.len(), 3);
        let texts: Vec<_> = index.records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["Alpha line.", "Beta line.", "Gamma line."]);
        for (ordinal, record) in index.records.iter().enumerate() {
            assert_eq!(record.id, format!("{}_{ordinal}", index.document_id));
            assert_eq!(record.file_name, "essay.pdf");
        }
        // Persisted exactly once, and retrievable by id.
        assert_eq!(store.saved.lock().unwrap().len(), 1);
        let loaded = store.find_by_id(&index.document_id).await.unwrap().unwrap();
        assert_eq!(loaded, index);
    }

    #[tokio::test]
    async fn empty_document_never_reaches_the_store() {
        let (pipeline, store) = pipeline_with(vec![]);
        let err = pipeline.ingest("  \n\n \t ", "blank.pdf").await.unwrap_err();
        assert!(matches!(err, DocTalkError::EmptyDocument));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_passage_embedding_aborts_ingestion_with_its_ordinal() {
        // "Beta line." is missing from the table, so passage 1 fails.
        let (pipeline, store) = pipeline_with(vec![
            ("Alpha line.", vec![1.0, 0.0]),
            ("Gamma line.", vec![0.5, 0.5]),
        ]);

        let err = pipeline
            .ingest("Alpha line.\n\nBeta line.\n\nGamma line.", "essay.pdf")
            .await
            .unwrap_err();

        match err {
            DocTalkError::EmbeddingFailure { target, .. } => {
                assert_eq!(target, EmbedTarget::Passage(1));
            }
            other => panic!("expected EmbeddingFailure, got {other:?}"),
        }
        // All-or-nothing: no partial index committed.
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn divergent_embedding_dimensions_fail_ingestion() {
        let (pipeline, store) = pipeline_with(vec![
            ("short", vec![1.0, 0.0]),
            ("long", vec![1.0, 0.0, 0.0]),
        ]);
        let err = pipeline.ingest("short\n\nlong", "odd.pdf").await.unwrap_err();
        assert!(matches!(err, DocTalkError::DimensionMismatch { .. }));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_returns_ranked_context_in_order() {
        let (pipeline, _store) = pipeline_with(vec![
            ("first", vec![1.0, 0.0]),
            ("second", vec![0.0, 1.0]),
            ("third", vec![0.7, 0.7]),
            ("what is second about?", vec![0.1, 1.0]),
        ]);
        let index = pipeline.ingest("first\n\nsecond\n\nthird", "notes.pdf").await.unwrap();

        let outcome = pipeline
            .query("what is second about?", &index, 2)
            .await
            .unwrap();

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].record.text, "second");
        assert_eq!(outcome.context, "second\n\nthird");
        assert!(outcome.matches[0].score >= outcome.matches[1].score);
        assert_eq!(outcome.matches[0].citation(), "From: notes.pdf");
    }

    #[tokio::test]
    async fn query_embedding_failure_is_marked_as_query() {
        let (pipeline, _store) = pipeline_with(vec![("only", vec![1.0])]);
        let index = pipeline.ingest("only", "one.pdf").await.unwrap();

        let err = pipeline.query("unknown question", &index, 3).await.unwrap_err();
        match err {
            DocTalkError::EmbeddingFailure { target, .. } => {
                assert_eq!(target, EmbedTarget::Query);
            }
            other => panic!("expected EmbeddingFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_match_texts_fail_with_no_relevant_context() {
        // Build an index with blank record texts directly; the chunker would
        // never produce these, but the store might hold anything.
        let (pipeline, store) = pipeline_with(vec![("q", vec![1.0, 0.0])]);
        let index = DocumentIndex {
            document_id: "doc_blank".into(),
            file_name: "blank.pdf".into(),
            records: vec![VectorRecord {
                id: "doc_blank_0".into(),
                values: vec![1.0, 0.0],
                text: "   ".into(),
                document_id: "doc_blank".into(),
                file_name: "blank.pdf".into(),
            }],
        };
        store.save(&index).await.unwrap();

        let err = pipeline.query("q", &index, 3).await.unwrap_err();
        assert!(matches!(err, DocTalkError::NoRelevantContext));
    }

    #[tokio::test]
    async fn querying_an_empty_index_fails_with_no_relevant_context() {
        let (pipeline, _store) = pipeline_with(vec![("q", vec![1.0])]);
        let index = DocumentIndex {
            document_id: "doc_none".into(),
            file_name: "none.pdf".into(),
            records: vec![],
        };
        let err = pipeline.query("q", &index, 3).await.unwrap_err();
        assert!(matches!(err, DocTalkError::NoRelevantContext));
    }

    #[tokio::test]
    async fn unknown_document_id_is_not_found() {
        let (pipeline, _store) = pipeline_with(vec![("q", vec![1.0])]);
        let err = pipeline
            .query_document("q", "doc_does_not_exist", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, DocTalkError::NotFound(_)));
    }

    #[test]
    fn system_prompt_embeds_the_context() {
        let prompt = system_prompt("CTX");
        assert!(prompt.ends_with("context:\nCTX"));
    }
}
