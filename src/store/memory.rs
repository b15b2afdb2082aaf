//! Memory store client: ID minting, partial field merge and thread grouping.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::store::ids::{
    doc_id_from_key, doc_key, generate_doc_id, generate_thread_id, thread_id_from_key, thread_key,
};
use crate::store::memory_backend::InMemoryBackend;
use crate::store::record::{DocumentRecord, MemoryEntry};
use crate::store::traits::MemoryBackend;

/// Placeholder used when an entry carries no source or format.
const UNKNOWN: &str = "unknown";

/// Identifiers resolved by a write, to be reused by follow-up writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordIds {
    pub doc_id: String,
    pub thread_id: String,
}

/// Shared store client. Construct once and hand an `Arc` to every
/// component that records provenance.
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory (tests, dry runs).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Log an entry against a record, creating the record and/or thread
    /// when no ID is given.
    ///
    /// A record is appended to its thread only on the write that mints its
    /// `doc_id`. Fields absent from `entry` keep their previous values.
    /// Writes are per field and not atomic.
    pub async fn log(
        &self,
        entry: MemoryEntry,
        doc_id: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<RecordIds, DatabaseError> {
        let (doc_id, new_record) = match doc_id.filter(|id| !id.is_empty()) {
            Some(id) => (id.to_string(), false),
            None => {
                let source = entry.source.as_deref().unwrap_or(UNKNOWN);
                let format = entry.format.as_deref().unwrap_or(UNKNOWN);
                (generate_doc_id(source, format), true)
            }
        };

        let thread_id = match thread_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => generate_thread_id(),
        };

        let key = doc_key(&doc_id);

        if !new_record {
            self.check_membership(&key, &doc_id, &thread_id).await?;
        }

        let timestamp = Utc::now().to_rfc3339();
        let stored = entry
            .into_stored_fields(&timestamp, &thread_id)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        for (field, value) in &stored {
            self.backend.set_field(&key, field, value).await?;
        }

        if new_record {
            self.backend.push_thread(&thread_key(&thread_id), &key).await?;
        }

        debug!(
            doc_id = %doc_id,
            thread_id = %thread_id,
            fields = stored.len(),
            new_record,
            "Memory entry logged"
        );

        Ok(RecordIds { doc_id, thread_id })
    }

    /// Read a record back. `None` if nothing was ever written under `doc_id`.
    pub async fn get_record(&self, doc_id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let raw = self.backend.get_fields(&doc_key(doc_id)).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentRecord::from_fields(doc_id, raw)))
    }

    /// IDs of every record in the store, sorted.
    pub async fn doc_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let keys = self.backend.record_keys().await?;
        Ok(keys
            .iter()
            .filter_map(|key| doc_id_from_key(key))
            .map(str::to_string)
            .collect())
    }

    /// Record keys (`doc:<id>`) of a thread, in arrival order.
    pub async fn thread_keys(&self, thread_id: &str) -> Result<Vec<String>, DatabaseError> {
        self.backend.thread_members(&thread_key(thread_id)).await
    }

    /// Records of a thread, in arrival order.
    pub async fn thread_records(
        &self,
        thread_id: &str,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let mut records = Vec::new();
        for key in self.thread_keys(thread_id).await? {
            let Some(doc_id) = doc_id_from_key(&key) else {
                warn!(key = %key, "Skipping malformed thread member");
                continue;
            };
            if let Some(record) = self.get_record(doc_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// The thread a record was created in. This is the authoritative
    /// membership; a record's stored `thread_id` field may differ.
    pub async fn membership(&self, doc_id: &str) -> Result<Option<String>, DatabaseError> {
        let found = self.backend.find_thread(&doc_key(doc_id)).await?;
        Ok(found.and_then(|key| thread_id_from_key(&key).map(str::to_string)))
    }

    /// Warn when an update is written under a thread other than the one the
    /// record belongs to. The write still goes ahead.
    async fn check_membership(
        &self,
        key: &str,
        doc_id: &str,
        thread_id: &str,
    ) -> Result<(), DatabaseError> {
        if let Some(member_of) = self.backend.find_thread(key).await?
            && member_of != thread_key(thread_id)
        {
            warn!(
                doc_id = %doc_id,
                thread_id = %thread_id,
                member_of = %member_of,
                "Update written under a different thread than the record belongs to; \
                 stored thread_id will diverge from membership"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::in_memory()
    }

    fn initial_entry() -> MemoryEntry {
        MemoryEntry::new()
            .with_source("order.eml")
            .with_format("Email")
            .with_intent("RFQ")
            .with_urgency("High")
    }

    #[tokio::test]
    async fn new_write_mints_record_and_appends_to_thread() {
        let store = store();
        let ids = store.log(initial_entry(), None, None).await.unwrap();

        assert!(ids.doc_id.starts_with("email_order.eml_"));
        assert!(!ids.thread_id.is_empty());

        let keys = store.thread_keys(&ids.thread_id).await.unwrap();
        assert_eq!(keys, vec![format!("doc:{}", ids.doc_id)]);

        let record = store.get_record(&ids.doc_id).await.unwrap().unwrap();
        assert_eq!(record.intent.as_deref(), Some("RFQ"));
        assert_eq!(record.thread_id.as_deref(), Some(ids.thread_id.as_str()));
        assert!(record.timestamp.is_some());
    }

    #[tokio::test]
    async fn missing_source_and_format_default_to_unknown() {
        let store = store();
        let ids = store
            .log(MemoryEntry::new().with_intent("Other"), None, None)
            .await
            .unwrap();
        assert!(ids.doc_id.starts_with("unknown_unknown_"));
    }

    #[tokio::test]
    async fn update_with_existing_doc_id_does_not_append_again() {
        let store = store();
        let ids = store.log(initial_entry(), None, None).await.unwrap();

        let again = store
            .log(initial_entry(), Some(&ids.doc_id), Some(&ids.thread_id))
            .await
            .unwrap();
        assert_eq!(again, ids);

        let keys = store.thread_keys(&ids.thread_id).await.unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn update_merges_without_discarding_fields() {
        let store = store();
        let ids = store.log(initial_entry(), None, None).await.unwrap();

        store
            .log(
                MemoryEntry::new()
                    .with_urgency("Low")
                    .with_field("crm_payload", json!({"priority": "Low"})),
                Some(&ids.doc_id),
                Some(&ids.thread_id),
            )
            .await
            .unwrap();

        let record = store.get_record(&ids.doc_id).await.unwrap().unwrap();
        assert_eq!(record.source.as_deref(), Some("order.eml"));
        assert_eq!(record.format.as_deref(), Some("Email"));
        assert_eq!(record.intent.as_deref(), Some("RFQ"));
        assert_eq!(record.urgency.as_deref(), Some("Low"));
        assert_eq!(
            record.extension_value("crm_payload"),
            Some(json!({"priority": "Low"}))
        );
    }

    #[tokio::test]
    async fn update_without_thread_id_mints_fresh_thread_but_keeps_membership() {
        let store = store();
        let ids = store.log(initial_entry(), None, None).await.unwrap();

        let update = store
            .log(MemoryEntry::new().with_intent("Invoice"), Some(&ids.doc_id), None)
            .await
            .unwrap();
        assert_eq!(update.doc_id, ids.doc_id);
        assert_ne!(update.thread_id, ids.thread_id);

        // The fresh thread never gains the record.
        assert!(store.thread_keys(&update.thread_id).await.unwrap().is_empty());

        // Stored field follows the latest write, membership does not.
        let record = store.get_record(&ids.doc_id).await.unwrap().unwrap();
        assert_eq!(record.thread_id.as_deref(), Some(update.thread_id.as_str()));
        assert_eq!(
            store.membership(&ids.doc_id).await.unwrap().as_deref(),
            Some(ids.thread_id.as_str())
        );
    }

    #[tokio::test]
    async fn caller_supplied_thread_groups_new_records() {
        let store = store();
        let first = store.log(initial_entry(), None, None).await.unwrap();
        let second = store
            .log(initial_entry(), None, Some(&first.thread_id))
            .await
            .unwrap();

        assert_ne!(first.doc_id, second.doc_id);
        let records = store.thread_records(&first.thread_id).await.unwrap();
        let doc_ids: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(doc_ids, vec![first.doc_id.as_str(), second.doc_id.as_str()]);
    }

    #[tokio::test]
    async fn empty_ids_are_treated_as_absent() {
        let store = store();
        let ids = store.log(initial_entry(), Some(""), Some("")).await.unwrap();
        assert!(!ids.doc_id.is_empty());
        assert_eq!(store.thread_keys(&ids.thread_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn doc_ids_lists_every_record() {
        let store = store();
        assert!(store.doc_ids().await.unwrap().is_empty());

        let a = store.log(initial_entry(), None, None).await.unwrap();
        let b = store.log(initial_entry(), None, None).await.unwrap();
        store
            .log(MemoryEntry::new().with_urgency("Low"), Some(&a.doc_id), Some(&a.thread_id))
            .await
            .unwrap();

        let mut expected = vec![a.doc_id, b.doc_id];
        expected.sort();
        assert_eq!(store.doc_ids().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn unknown_record_reads_as_none() {
        let store = store();
        assert!(store.get_record("nope").await.unwrap().is_none());
        assert!(store.membership("nope").await.unwrap().is_none());
    }
}
