//! Backend trait for the memory store.
//!
//! A backend is a plain key-value service: a field map per record key and
//! an ordered list per thread key. Merge and ID semantics live in
//! [`MemoryStore`](super::MemoryStore), so every backend behaves the same.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::DatabaseError;

#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Write (insert or overwrite) a single field on a record.
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), DatabaseError>;

    /// Read every field stored under a record key. Empty if the key is unknown.
    async fn get_fields(&self, key: &str) -> Result<BTreeMap<String, String>, DatabaseError>;

    /// Every record key that has at least one field, sorted.
    async fn record_keys(&self) -> Result<Vec<String>, DatabaseError>;

    /// Append a record key to the end of a thread sequence.
    async fn push_thread(&self, thread_key: &str, doc_key: &str) -> Result<(), DatabaseError>;

    /// Record keys of a thread, in arrival order.
    async fn thread_members(&self, thread_key: &str) -> Result<Vec<String>, DatabaseError>;

    /// The thread key a record was appended to, if any.
    async fn find_thread(&self, doc_key: &str) -> Result<Option<String>, DatabaseError>;
}
