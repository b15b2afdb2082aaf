//! libSQL backend: async `MemoryBackend` implementation.
//!
//! Supports local file, in-memory and remote (sqld / Turso) databases.
//! Record fields live in `doc_fields`, one row per (record, field);
//! thread sequences in `thread_members`, ordered by insertion id.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::MemoryBackend;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Connect to a remote libSQL server and run migrations.
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to connect to {url}: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(url = %url, "Remote database connected");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl MemoryBackend for LibSqlBackend {
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO doc_fields (doc_key, field, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT (doc_key, field) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, field, value],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_field: {e}")))?;

        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<BTreeMap<String, String>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT field, value FROM doc_fields WHERE doc_key = ?1",
                params![key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_fields: {e}")))?;

        let mut fields = BTreeMap::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_fields: {e}")))?
        {
            let field: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            let value: String = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            fields.insert(field, value);
        }
        Ok(fields)
    }

    async fn record_keys(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT DISTINCT doc_key FROM doc_fields ORDER BY doc_key",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_keys: {e}")))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("record_keys: {e}")))?
        {
            let key: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            keys.push(key);
        }
        Ok(keys)
    }

    async fn push_thread(&self, thread_key: &str, doc_key: &str) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO thread_members (thread_key, doc_key) VALUES (?1, ?2)",
            params![thread_key, doc_key],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("push_thread: {e}")))?;

        debug!(thread = thread_key, doc = doc_key, "Record appended to thread");
        Ok(())
    }

    async fn thread_members(&self, thread_key: &str) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT doc_key FROM thread_members WHERE thread_key = ?1 ORDER BY id ASC",
                params![thread_key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("thread_members: {e}")))?;

        let mut members = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("thread_members: {e}")))?
        {
            let doc_key: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            members.push(doc_key);
        }
        Ok(members)
    }

    async fn find_thread(&self, doc_key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT thread_key FROM thread_members WHERE doc_key = ?1 ORDER BY id ASC LIMIT 1",
                params![doc_key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_thread: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let thread_key: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(thread_key))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_thread: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{MemoryEntry, MemoryStore};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn set_field_upserts() {
        let db = test_db().await;
        db.set_field("doc:a", "intent", "RFQ").await.unwrap();
        db.set_field("doc:a", "urgency", "High").await.unwrap();
        db.set_field("doc:a", "intent", "Invoice").await.unwrap();

        let fields = db.get_fields("doc:a").await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["intent"], "Invoice");
        assert_eq!(fields["urgency"], "High");
    }

    #[tokio::test]
    async fn unknown_key_has_no_fields() {
        let db = test_db().await;
        assert!(db.get_fields("doc:missing").await.unwrap().is_empty());
        assert!(db.find_thread("doc:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_keys_are_distinct_and_sorted() {
        let db = test_db().await;
        db.set_field("doc:b", "format", "JSON").await.unwrap();
        db.set_field("doc:a", "format", "Email").await.unwrap();
        db.set_field("doc:b", "intent", "Invoice").await.unwrap();

        assert_eq!(
            db.record_keys().await.unwrap(),
            vec!["doc:a".to_string(), "doc:b".to_string()]
        );
    }

    #[tokio::test]
    async fn thread_members_in_insertion_order() {
        let db = test_db().await;
        db.push_thread("thread:t", "doc:z").await.unwrap();
        db.push_thread("thread:t", "doc:a").await.unwrap();
        db.push_thread("thread:other", "doc:m").await.unwrap();

        assert_eq!(
            db.thread_members("thread:t").await.unwrap(),
            vec!["doc:z".to_string(), "doc:a".to_string()]
        );
        assert_eq!(
            db.find_thread("doc:a").await.unwrap().as_deref(),
            Some("thread:t")
        );
    }

    #[tokio::test]
    async fn memory_store_over_libsql_merges_and_round_trips() {
        let store = MemoryStore::new(Arc::new(test_db().await));
        let ids = store
            .log(
                MemoryEntry::new().with_source("po.json").with_format("JSON"),
                None,
                None,
            )
            .await
            .unwrap();

        let nested = json!({"line_items": [{"description": "bolts", "quantity": 10}]});
        store
            .log(
                MemoryEntry::new().with_field("parsed_data", nested.clone()),
                Some(&ids.doc_id),
                Some(&ids.thread_id),
            )
            .await
            .unwrap();

        let record = store.get_record(&ids.doc_id).await.unwrap().unwrap();
        assert_eq!(record.source.as_deref(), Some("po.json"));
        assert_eq!(record.extension_value("parsed_data"), Some(nested));
        assert_eq!(store.thread_keys(&ids.thread_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_file_database_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("memory.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_field("doc:x", "format", "PDF").await.unwrap();
        }
        assert!(path.exists());

        let reopened = LibSqlBackend::new_local(&path).await.unwrap();
        let fields = reopened.get_fields("doc:x").await.unwrap();
        assert_eq!(fields["format"], "PDF");
    }
}
