//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Concatenated system messages, for APIs that take the system prompt
    /// separately.
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

/// A completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
    pub response_id: Option<String>,
}

/// An LLM backend capable of plain chat completion.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier sent to the API.
    fn model_name(&self) -> &str;

    /// (input, output) price per token in USD.
    fn cost_per_token(&self) -> (Decimal, Decimal);

    /// Run a completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Estimated USD cost of a response from this provider.
    fn estimate_cost(&self, response: &CompletionResponse) -> Decimal {
        let (input, output) = self.cost_per_token();
        input * Decimal::from(response.input_tokens) + output * Decimal::from(response.output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn request_builder_sets_options() {
        let req = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.2)
            .with_max_tokens(256);
        assert_eq!(req.max_tokens, Some(256));
        assert_eq!(req.temperature, Some(0.2));
    }

    #[test]
    fn system_prompt_joins_system_messages() {
        let req = CompletionRequest::new(vec![
            ChatMessage::system("one"),
            ChatMessage::user("question"),
            ChatMessage::system("two"),
        ]);
        assert_eq!(req.system_prompt().as_deref(), Some("one\n\ntwo"));

        let bare = CompletionRequest::new(vec![ChatMessage::user("q")]);
        assert!(bare.system_prompt().is_none());
    }

    struct Priced;

    #[async_trait]
    impl LlmProvider for Priced {
        fn model_name(&self) -> &str {
            "priced"
        }
        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (dec!(0.001), dec!(0.002))
        }
        async fn complete(&self, _r: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            unimplemented!("pricing only")
        }
    }

    #[test]
    fn estimate_cost_uses_token_prices() {
        let response = CompletionResponse {
            content: String::new(),
            input_tokens: 100,
            output_tokens: 10,
            finish_reason: FinishReason::Stop,
            response_id: None,
        };
        assert_eq!(Priced.estimate_cost(&response), dec!(0.120));
    }
}
