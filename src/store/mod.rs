//! Persistence layer: the shared memory store for document provenance.

pub mod ids;
pub mod libsql_backend;
pub mod memory;
pub mod memory_backend;
pub mod migrations;
pub mod record;
pub mod traits;

pub use ids::{generate_doc_id, generate_thread_id};
pub use libsql_backend::LibSqlBackend;
pub use memory::{MemoryStore, RecordIds};
pub use memory_backend::InMemoryBackend;
pub use record::{DocumentRecord, MemoryEntry};
pub use traits::MemoryBackend;
