//! LLM integration for the document router.
//!
//! Supports:
//! - **OpenAI**: chat completions API, or any server speaking the same contract
//! - **Anthropic**: Messages API
//!
//! Both providers sit behind the `LlmProvider` trait. The classifier and the
//! extractor are built on top of it.

pub mod anthropic;
pub mod classifier;
pub mod extractor;
mod http;
pub mod openai;
pub(crate) mod parse;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use classifier::LlmClassifier;
pub use extractor::LlmExtractor;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "claude-sonnet-4-20250514",
            LlmBackend::OpenAi => "gpt-4o",
        }
    }

    /// Environment variable holding the API key for this backend.
    pub fn api_key_var(self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
            LlmBackend::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmBackend::OpenAi),
            "anthropic" => Ok(LlmBackend::Anthropic),
            other => Err(format!("unknown LLM backend '{other}' (expected openai or anthropic)")),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => {
            let provider = AnthropicProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?;
            tracing::info!("Using Anthropic (model: {})", config.model);
            Ok(Arc::new(provider))
        }
        LlmBackend::OpenAi => {
            let provider = OpenAiProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?;
            tracing::info!("Using OpenAI (model: {})", config.model);
            Ok(Arc::new(provider))
        }
    }
}
