//! SQLite-backed document store.
//!
//! Documents are stored as JSON text, one row per document, keyed by
//! (database, collection). The SQLite rowid doubles as the document's
//! store-internal `_id`.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::{Document, DocumentStore, ID_FIELD};

/// Document store over a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening document store {}", path.display()))?;
        Self::init(&conn)?;

        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory store")?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                 id         INTEGER PRIMARY KEY,
                 database_name   TEXT NOT NULL,
                 collection_name TEXT NOT NULL,
                 body       TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_documents_scope
                 ON documents (database_name, collection_name);",
        )
        .context("initializing document store schema")?;
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, body FROM documents
                 WHERE database_name = ?1 AND collection_name = ?2
                 ORDER BY id",
            )
            .context("preparing fetch query")?;

        let rows = stmt
            .query_map(params![database, collection], |row| {
                let id: i64 = row.get(0)?;
                let body: String = row.get(1)?;
                Ok((id, body))
            })
            .context("querying documents")?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row.context("reading document row")?;
            let mut doc: Document = serde_json::from_str(&body)
                .with_context(|| format!("document {} is not a JSON object", id))?;
            doc.insert(ID_FIELD.to_string(), serde_json::Value::from(id));
            docs.push(doc);
        }

        Ok(docs)
    }

    fn insert_many(&self, database: &str, collection: &str, docs: &[Document]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO documents (database_name, collection_name, body) VALUES (?1, ?2, ?3)")
            .context("preparing insert")?;

        for doc in docs {
            let body = serde_json::to_string(doc).context("serializing document")?;
            stmt.execute(params![database, collection, body])
                .context("inserting document")?;
        }

        Ok(docs.len())
    }

    fn count(&self, database: &str, collection: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE database_name = ?1 AND collection_name = ?2",
                params![database, collection],
                |row| row.get(0),
            )
            .context("counting documents")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_insert_and_fetch_round_trip() {
        let store = SqliteStore::in_memory().unwrap();

        let docs = vec![
            doc(r#"{"packet_rate": 10.5, "protocol": "tcp", "label": 0}"#),
            doc(r#"{"packet_rate": 99.0, "protocol": "udp", "label": 1}"#),
        ];
        let written = store.insert_many("netdb", "flows", &docs).unwrap();
        assert_eq!(written, 2);

        let fetched = store.fetch_all("netdb", "flows").unwrap();
        assert_eq!(fetched.len(), 2);

        // _id is attached on fetch
        assert!(fetched[0].contains_key(ID_FIELD));
        assert_eq!(
            fetched[0].get("protocol"),
            Some(&serde_json::Value::from("tcp"))
        );
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .insert_many("netdb", "flows", &[doc(r#"{"a": 1}"#)])
            .unwrap();
        store
            .insert_many("netdb", "alerts", &[doc(r#"{"b": 2}"#), doc(r#"{"b": 3}"#)])
            .unwrap();

        assert_eq!(store.count("netdb", "flows").unwrap(), 1);
        assert_eq!(store.count("netdb", "alerts").unwrap(), 2);
        assert_eq!(store.count("other", "flows").unwrap(), 0);
    }

    #[test]
    fn test_fetch_preserves_insertion_order() {
        let store = SqliteStore::in_memory().unwrap();

        let docs: Vec<Document> = (0..5)
            .map(|i| doc(&format!(r#"{{"seq": {}}}"#, i)))
            .collect();
        store.insert_many("netdb", "flows", &docs).unwrap();

        let fetched = store.fetch_all("netdb", "flows").unwrap();
        for (i, d) in fetched.iter().enumerate() {
            assert_eq!(d.get("seq"), Some(&serde_json::Value::from(i as i64)));
        }
    }
}
