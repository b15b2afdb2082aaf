//! LLM-backed intent and urgency classification.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::parse::{MAX_PROMPT_CHARS, parse_json_reply, truncate_chars};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Classification, Intent, IntentClassifier, Urgency};

/// Classification must be reproducible for the same text.
const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// The reply is a two-field object.
const CLASSIFY_MAX_TOKENS: u32 = 100;

const SYSTEM_PROMPT: &str =
    "You are an intelligent assistant for business communication processing.";

/// Classifies document text through an [`LlmProvider`].
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn build_prompt(text: &str) -> String {
        let text = truncate_chars(text, MAX_PROMPT_CHARS);
        format!(
            r#"Classify the following message by:
1. Intent: one of ["RFQ", "Invoice", "Complaint", "Regulation", "General", "Other"]
2. Urgency: one of ["High", "Medium", "Low"]

Text:
"""{text}"""

Respond in the following JSON format:
{{
  "intent": "Invoice",
  "urgency": "High"
}}"#
        )
    }
}

/// Read `intent` and `urgency` from a parsed reply. Missing or
/// unrecognised labels become `Unknown`.
fn classification_from_reply(reply: &Value) -> Classification {
    let label = |key: &str| reply.get(key).and_then(Value::as_str).unwrap_or_default();
    Classification::new(
        Intent::from_label(label("intent")),
        Urgency::from_label(label("urgency")),
    )
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, text: &str) -> Classification {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(text)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Classification request failed, using Unknown");
                return Classification::unknown();
            }
        };

        debug!(
            model = %self.llm.model_name(),
            cost = %self.llm.estimate_cost(&response),
            raw = %response.content,
            "Classification reply"
        );

        match parse_json_reply(&response.content) {
            Ok(reply) => classification_from_reply(&reply),
            Err(e) => {
                warn!(error = %e, "Classification reply was not JSON, using Unknown");
                Classification::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionResponse, FinishReason};

    /// Returns a canned reply and records the last request.
    struct MockLlm {
        reply: Result<String, ()>,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl MockLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last_request: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            *self.last_request.lock().unwrap() = Some(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".to_string(),
                    reason: "offline".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn parses_plain_reply() {
        let llm = Arc::new(MockLlm::replying(r#"{"intent": "RFQ", "urgency": "High"}"#));
        let classifier = LlmClassifier::new(llm.clone());

        let result = classifier.classify("Please quote 100 widgets").await;
        assert_eq!(result, Classification::new(Intent::Rfq, Urgency::High));

        let request = llm.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.messages[1].content.contains("Please quote 100 widgets"));
    }

    #[tokio::test]
    async fn parses_fenced_reply() {
        let llm = Arc::new(MockLlm::replying(
            "```json\n{\"intent\": \"Complaint\", \"urgency\": \"Medium\"}\n```",
        ));
        let result = LlmClassifier::new(llm).classify("This is broken").await;
        assert_eq!(result, Classification::new(Intent::Complaint, Urgency::Medium));
    }

    #[tokio::test]
    async fn unrecognised_labels_become_unknown() {
        let llm = Arc::new(MockLlm::replying(r#"{"intent": "Partnership", "urgency": "Low"}"#));
        let result = LlmClassifier::new(llm).classify("Let's collaborate").await;
        assert_eq!(result, Classification::new(Intent::Unknown, Urgency::Low));
    }

    #[tokio::test]
    async fn garbage_reply_falls_back() {
        let llm = Arc::new(MockLlm::replying("I cannot classify this."));
        let result = LlmClassifier::new(llm).classify("???").await;
        assert_eq!(result, Classification::unknown());
    }

    #[tokio::test]
    async fn transport_failure_falls_back() {
        let llm = Arc::new(MockLlm::failing());
        let result = LlmClassifier::new(llm).classify("text").await;
        assert_eq!(result, Classification::unknown());
    }

    #[test]
    fn missing_keys_are_unknown() {
        let c = classification_from_reply(&json!({"intent": "Invoice"}));
        assert_eq!(c, Classification::new(Intent::Invoice, Urgency::Unknown));
    }

    #[test]
    fn prompt_truncates_long_text() {
        let long = "a".repeat(MAX_PROMPT_CHARS + 500);
        let prompt = LlmClassifier::build_prompt(&long);
        assert!(prompt.len() < MAX_PROMPT_CHARS + 400);
    }
}
