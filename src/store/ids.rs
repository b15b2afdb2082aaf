//! Identifier minting and storage key layout.

use uuid::Uuid;

/// Number of hex characters appended to a document ID.
const DOC_ID_SUFFIX_LEN: usize = 8;

/// Key prefix for document records.
const DOC_KEY_PREFIX: &str = "doc:";

/// Key prefix for thread sequences.
const THREAD_KEY_PREFIX: &str = "thread:";

/// Mint a document ID: `<format>_<source>_<suffix>`.
///
/// The prefix is deterministic; the suffix is random and short. Unique
/// enough for provenance tracking, not a security token.
pub fn generate_doc_id(source_name: &str, file_format: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        file_format.to_lowercase(),
        source_name,
        &suffix[..DOC_ID_SUFFIX_LEN]
    )
}

/// Mint an opaque thread ID.
pub fn generate_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Storage key for a document record.
pub fn doc_key(doc_id: &str) -> String {
    format!("{DOC_KEY_PREFIX}{doc_id}")
}

/// Storage key for a thread sequence.
pub fn thread_key(thread_id: &str) -> String {
    format!("{THREAD_KEY_PREFIX}{thread_id}")
}

/// Recover the document ID from a record key (`doc:<id>` → `<id>`).
pub fn doc_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(DOC_KEY_PREFIX)
}

/// Recover the thread ID from a thread key (`thread:<id>` → `<id>`).
pub fn thread_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(THREAD_KEY_PREFIX)
}
