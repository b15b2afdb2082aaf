//! In-process backend. Used by tests and as a stand-in store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::store::traits::MemoryBackend;

#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, BTreeMap<String, String>>>,
    threads: RwLock<HashMap<String, Vec<String>>>,
    rejected_field: Option<String>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write of `field`, leaving the record as it was. Lets
    /// callers exercise their store-failure paths.
    pub fn rejecting_field(mut self, field: impl Into<String>) -> Self {
        self.rejected_field = Some(field.into());
        self
    }

    /// Number of distinct record keys written so far.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Total number of thread appends across all threads.
    pub async fn thread_append_count(&self) -> usize {
        self.threads.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), DatabaseError> {
        if self.rejected_field.as_deref() == Some(field) {
            return Err(DatabaseError::Query(format!(
                "write of {field} on {key} rejected"
            )));
        }
        let mut records = self.records.write().await;
        records
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<BTreeMap<String, String>, DatabaseError> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned().unwrap_or_default())
    }

    async fn record_keys(&self) -> Result<Vec<String>, DatabaseError> {
        let records = self.records.read().await;
        let mut keys: Vec<String> = records.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn push_thread(&self, thread_key: &str, doc_key: &str) -> Result<(), DatabaseError> {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_key.to_string())
            .or_default()
            .push(doc_key.to_string());
        Ok(())
    }

    async fn thread_members(&self, thread_key: &str) -> Result<Vec<String>, DatabaseError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_key).cloned().unwrap_or_default())
    }

    async fn find_thread(&self, doc_key: &str) -> Result<Option<String>, DatabaseError> {
        let threads = self.threads.read().await;
        Ok(threads
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == doc_key))
            .map(|(thread, _)| thread.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fields_overwrite_individually() {
        let backend = InMemoryBackend::new();
        backend.set_field("doc:a", "x", "1").await.unwrap();
        backend.set_field("doc:a", "y", "2").await.unwrap();
        backend.set_field("doc:a", "x", "3").await.unwrap();

        let fields = backend.get_fields("doc:a").await.unwrap();
        assert_eq!(fields.get("x").map(String::as_str), Some("3"));
        assert_eq!(fields.get("y").map(String::as_str), Some("2"));
        assert_eq!(backend.record_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_field_fails_without_touching_others() {
        let backend = InMemoryBackend::new().rejecting_field("crm_payload");
        backend.set_field("doc:a", "source", "a.eml").await.unwrap();

        let err = backend.set_field("doc:a", "crm_payload", "{}").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));

        let fields = backend.get_fields("doc:a").await.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(!fields.contains_key("crm_payload"));
    }

    #[tokio::test]
    async fn threads_keep_arrival_order() {
        let backend = InMemoryBackend::new();
        backend.push_thread("thread:t", "doc:b").await.unwrap();
        backend.push_thread("thread:t", "doc:a").await.unwrap();

        assert_eq!(
            backend.thread_members("thread:t").await.unwrap(),
            vec!["doc:b".to_string(), "doc:a".to_string()]
        );
        assert_eq!(
            backend.find_thread("doc:a").await.unwrap().as_deref(),
            Some("thread:t")
        );
        assert_eq!(backend.thread_append_count().await, 2);
    }
}
