//! # DocTalk Store
//!
//! Durable storage for document indexes. SQLite-backed; saves are
//! transactional so an index is either fully present or absent.

pub mod sqlite;

pub use sqlite::SqliteStore;
