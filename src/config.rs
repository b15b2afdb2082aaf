//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{self, ConfigError};
use crate::llm::{LlmBackend, LlmConfig};

const DEFAULT_DB_PATH: &str = "./data/doc-router.db";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Where the memory store lives.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// Local libSQL file, created on first use.
    Local { path: PathBuf },
    /// Remote libSQL server (sqld / Turso).
    Remote {
        url: String,
        auth_token: SecretString,
    },
}

/// Everything needed to assemble a router.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub llm: LlmConfig,
}

impl PipelineConfig {
    /// Build config from the process environment.
    ///
    /// - `DOC_ROUTER_DB_PATH`: local database file (default `./data/doc-router.db`)
    /// - `DOC_ROUTER_DB_URL`, `DOC_ROUTER_DB_AUTH_TOKEN`: remote database, takes
    ///   precedence over the local path
    /// - `DOC_ROUTER_LLM_BACKEND`: `openai` (default) or `anthropic`
    /// - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`: required for the chosen backend
    /// - `DOC_ROUTER_MODEL`, `DOC_ROUTER_LLM_BASE_URL`, `DOC_ROUTER_LLM_TIMEOUT_SECS`
    pub fn from_env() -> error::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Build config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match get("DOC_ROUTER_DB_URL") {
            Some(url) => StoreConfig::Remote {
                url,
                auth_token: SecretString::from(get("DOC_ROUTER_DB_AUTH_TOKEN").unwrap_or_default()),
            },
            None => StoreConfig::Local {
                path: PathBuf::from(
                    get("DOC_ROUTER_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
                ),
            },
        };

        let backend = match get("DOC_ROUTER_LLM_BACKEND") {
            Some(raw) => raw
                .parse::<LlmBackend>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "DOC_ROUTER_LLM_BACKEND".to_string(),
                    message,
                })?,
            None => LlmBackend::OpenAi,
        };

        let key_var = backend.api_key_var();
        let api_key = get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let timeout_secs = match get("DOC_ROUTER_LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "DOC_ROUTER_LLM_TIMEOUT_SECS".to_string(),
                    message: format!("expected a positive number of seconds, got '{raw}'"),
                })?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(api_key),
            model: get("DOC_ROUTER_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
            base_url: get("DOC_ROUTER_LLM_BASE_URL"),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self { store, llm })
    }
}
