//! SQLite document store.
//!
//! One row per document plus one row per vector record. A save happens in a
//! single transaction, so a failed ingestion never leaves a partial index
//! behind. Embeddings are stored as little-endian f32 BLOBs, which
//! round-trip exactly.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use doctalk_core::error::{DocTalkError, Result};
use doctalk_core::traits::DocumentStore;
use doctalk_core::types::{DocumentIndex, VectorRecord};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| DocTalkError::Store(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                document_id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(document_id),
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_document
                ON records(document_id, ordinal);",
        )
        .map_err(|e| DocTalkError::Store(e.to_string()))?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DocTalkError::Store(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE documents (
                document_id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE records (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(document_id),
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            );",
        )
        .map_err(|e| DocTalkError::Store(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

/// Encode an embedding as a little-endian f32 BLOB.
fn encode_vector(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 BLOB back into an embedding.
fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(DocTalkError::Store(format!(
            "corrupt embedding blob: {} bytes is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save(&self, index: &DocumentIndex) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| DocTalkError::Store(e.to_string()))?;

        tx.execute(
            "INSERT INTO documents (document_id, file_name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                index.document_id,
                index.file_name,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DocTalkError::Store(e.to_string()))?;

        for record in &index.records {
            tx.execute(
                "INSERT INTO records (id, document_id, ordinal, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.id,
                    record.document_id,
                    record.ordinal() as i64,
                    record.text,
                    encode_vector(&record.values),
                ],
            )
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        }

        tx.commit().map_err(|e| DocTalkError::Store(e.to_string()))?;
        tracing::info!(
            document_id = %index.document_id,
            records = index.records.len(),
            "saved document index"
        );
        Ok(())
    }

    async fn find_by_id(&self, document_id: &str) -> Result<Option<DocumentIndex>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DocTalkError::Store(e.to_string()))?;

        // Only "no such row" means absence; any other SQLite failure is a
        // real store error and must not masquerade as NotFound upstream.
        let file_name: Option<String> = conn
            .query_row(
                "SELECT file_name FROM documents WHERE document_id = ?1",
                rusqlite::params![document_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        let Some(file_name) = file_name else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT id, text, embedding FROM records
                 WHERE document_id = ?1 ORDER BY ordinal ASC",
            )
            .map_err(|e| DocTalkError::Store(e.to_string()))?;

        let rows = stmt
            .query_map(rusqlite::params![document_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| DocTalkError::Store(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, text, blob) = row.map_err(|e| DocTalkError::Store(e.to_string()))?;
            records.push(VectorRecord {
                id,
                values: decode_vector(&blob)?,
                text,
                document_id: document_id.to_string(),
                file_name: file_name.clone(),
            });
        }

        Ok(Some(DocumentIndex {
            document_id: document_id.to_string(),
            file_name,
            records,
        }))
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT document_id, file_name FROM documents ORDER BY created_at DESC")
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| DocTalkError::Store(e.to_string()))?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(|e| DocTalkError::Store(e.to_string()))?);
        }
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index(document_id: &str, vectors: Vec<Vec<f32>>) -> DocumentIndex {
        let records = vectors
            .into_iter()
            .enumerate()
            .map(|(ordinal, values)| VectorRecord {
                id: VectorRecord::derive_id(document_id, ordinal),
                values,
                text: format!("passage {ordinal}"),
                document_id: document_id.to_string(),
                file_name: "sample.pdf".to_string(),
            })
            .collect();
        DocumentIndex {
            document_id: document_id.to_string(),
            file_name: "sample.pdf".to_string(),
            records,
        }
    }

    #[test]
    fn vector_blob_round_trips_losslessly() {
        let values = vec![0.0_f32, -1.5, 3.2e-7, f32::MAX, f32::MIN_POSITIVE];
        assert_eq!(decode_vector(&encode_vector(&values)).unwrap(), values);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        assert!(decode_vector(&[1, 2, 3]).is_err());
    }

    #[tokio::test]
    async fn save_and_find_round_trip_preserves_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let index = sample_index("doc_1_aa", vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]]);
        store.save(&index).await.unwrap();

        let loaded = store.find_by_id("doc_1_aa").await.unwrap().unwrap();
        assert_eq!(loaded, index);
        let ids: Vec<_> = loaded.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["doc_1_aa_0", "doc_1_aa_1", "doc_1_aa_2"]);
    }

    #[tokio::test]
    async fn unknown_id_is_absent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.find_by_id("doc_missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_document_id_fails_without_clobbering() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = sample_index("doc_2_bb", vec![vec![1.0]]);
        store.save(&first).await.unwrap();

        let second = sample_index("doc_2_bb", vec![vec![9.0], vec![8.0]]);
        assert!(store.save(&second).await.is_err());

        let loaded = store.find_by_id("doc_2_bb").await.unwrap().unwrap();
        assert_eq!(loaded, first);
    }

    #[tokio::test]
    async fn list_returns_stored_documents() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample_index("doc_3_cc", vec![vec![1.0]])).await.unwrap();
        let docs = store.list().await.unwrap();
        assert_eq!(docs, vec![("doc_3_cc".to_string(), "sample.pdf".to_string())]);
    }

    #[tokio::test]
    async fn unreadable_document_row_is_a_store_error_not_absence() {
        // A database whose documents table predates ours and lacks the
        // file_name column: the document exists but cannot be read. That
        // must surface as a Store error, never as Ok(None) / NotFound.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE documents (
                    document_id TEXT PRIMARY KEY,
                    created_at TEXT NOT NULL
                );
                INSERT INTO documents (document_id, created_at) VALUES ('doc_old', 'now');",
            )
            .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let err = store.find_by_id("doc_old").await.unwrap_err();
        assert!(matches!(err, DocTalkError::Store(_)));
    }

    #[tokio::test]
    async fn list_surfaces_undecodable_rows_as_store_errors() {
        // Same legacy-schema situation, but with a NULL where list expects
        // text: the row must not be silently dropped from the listing.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nulls.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE documents (
                    document_id TEXT PRIMARY KEY,
                    file_name TEXT,
                    created_at TEXT NOT NULL
                );
                INSERT INTO documents (document_id, file_name, created_at)
                    VALUES ('doc_null', NULL, 'now');",
            )
            .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, DocTalkError::Store(_)));
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&sample_index("doc_4_dd", vec![vec![0.25, 0.75]])).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.find_by_id("doc_4_dd").await.unwrap().unwrap();
        assert_eq!(loaded.records[0].values, vec![0.25, 0.75]);
    }
}
