//! Document store integration.
//!
//! The pipeline reads raw records from a named database/collection through
//! the [`DocumentStore`] trait; the shipped implementation keeps JSON
//! document bodies in SQLite. Each fetched document carries a store-internal
//! `_id` field that ingestion strips before modeling.

mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;

pub use sqlite::SqliteStore;

/// Store-internal identifier attached to every fetched document.
pub const ID_FIELD: &str = "_id";

/// A JSON document as a key→value map.
pub type Document = BTreeMap<String, serde_json::Value>;

/// Read/write access to a collection-organized document store.
pub trait DocumentStore {
    /// Fetch every document in a collection, `_id` included.
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    /// Insert documents into a collection, returning how many were written.
    fn insert_many(&self, database: &str, collection: &str, docs: &[Document]) -> Result<usize>;

    /// Number of documents in a collection.
    fn count(&self, database: &str, collection: &str) -> Result<usize>;
}
