//! Doc Router: LLM-classified document ingestion with a shared memory store.

pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::{PipelineConfig, StoreConfig};
use crate::llm::{LlmClassifier, LlmExtractor, create_provider};
use crate::loader::FileLoader;
use crate::pipeline::Router;
use crate::store::{LibSqlBackend, MemoryStore};

/// Open the memory store described by `config`.
pub async fn open_store(config: &StoreConfig) -> error::Result<MemoryStore> {
    let backend = match config {
        StoreConfig::Local { path } => LibSqlBackend::new_local(path).await?,
        StoreConfig::Remote { url, auth_token } => {
            LibSqlBackend::new_remote(url, auth_token.expose_secret()).await?
        }
    };
    Ok(MemoryStore::new(Arc::new(backend)))
}

/// Assemble a router with the file loader, the configured LLM and store.
pub async fn build_router(config: &PipelineConfig) -> error::Result<Router> {
    let llm = create_provider(&config.llm)?;
    let store = Arc::new(open_store(&config.store).await?);

    Ok(Router::new(
        Arc::new(FileLoader::new()),
        Arc::new(LlmClassifier::new(llm.clone())),
        Arc::new(LlmExtractor::new(llm)),
        store,
    ))
}
