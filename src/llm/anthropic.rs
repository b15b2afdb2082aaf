//! Anthropic Messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::http::{build_client, status_error, transport_error};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

const PROVIDER: &str = "anthropic";

/// Default API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when the request sets none.
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            api_key,
            model: model.into(),
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    /// System messages go in the top-level `system` field; the rest stay in
    /// `messages`.
    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": messages,
        });
        if let Some(system) = request.system_prompt() {
            body["system"] = serde_json::json!(system);
        }
        if let Some(t) = request.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

fn finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        let model = self.model.as_str();
        if model.contains("haiku") {
            (dec!(0.0000008), dec!(0.000004))
        } else if model.contains("opus") {
            (dec!(0.000015), dec!(0.000075))
        } else {
            (dec!(0.000003), dec!(0.000015))
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_body(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(PROVIDER, status, &headers, &text));
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        debug!(
            model = %self.model,
            input_tokens,
            output_tokens,
            "Anthropic completion finished"
        );

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason: finish_reason(parsed.stop_reason.as_deref()),
            response_id: parsed.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ChatMessage;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("test-key"),
            "claude-sonnet-4-20250514",
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn system_prompt_is_lifted_out_of_messages() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("classify things"),
            ChatMessage::user("text"),
        ]);
        let body = provider().build_body(&request);

        assert_eq!(body["system"], "classify things");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn endpoint_is_messages() {
        assert_eq!(provider().endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn parses_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "{\"intent\": "}, {"type": "text", "text": "\"Invoice\"}"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 8}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.content.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(text, "{\"intent\": \"Invoice\"}");
        assert_eq!(finish_reason(parsed.stop_reason.as_deref()), FinishReason::Stop);
    }
}
