//! LLM-backed schema extraction for raw JSON documents.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::parse::{MAX_PROMPT_CHARS, parse_json_reply, truncate_chars};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::StructuredExtractor;

const EXTRACT_TEMPERATURE: f32 = 0.2;

const EXTRACT_MAX_TOKENS: u32 = 2048;

const SYSTEM_PROMPT: &str = "You are a business document parser.";

/// Sentinel placed in `missing_fields` when extraction fails.
pub const PARSING_ERROR: &str = "LLM parsing error";

/// Result returned when the model call or its reply fails.
pub fn parsing_error_result() -> Value {
    json!({ "missing_fields": [PARSING_ERROR] })
}

/// Normalizes JSON documents onto a target schema through an [`LlmProvider`].
///
/// Failures degrade to [`parsing_error_result`] rather than an error.
pub struct LlmExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn build_prompt(raw: &Value, schema: &Value) -> Result<String, serde_json::Error> {
        let schema = serde_json::to_string_pretty(schema)?;
        let input = serde_json::to_string_pretty(raw)?;
        let input = truncate_chars(&input, MAX_PROMPT_CHARS);
        Ok(format!(
            "Your job is to convert the input JSON below into the target schema format.\n\
             If any fields cannot be matched, add a \"missing_fields\" list in the response.\n\n\
             TARGET SCHEMA:\n{schema}\n\n\
             INPUT JSON:\n{input}\n\n\
             Return ONLY a valid JSON object with the normalized data and (if needed) a \"missing_fields\" array."
        ))
    }

    async fn try_extract(&self, raw: &Value, schema: &Value) -> Result<Value, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(raw, schema)?),
        ])
        .with_temperature(EXTRACT_TEMPERATURE)
        .with_max_tokens(EXTRACT_MAX_TOKENS);

        let response = self.llm.complete(request).await?;

        debug!(
            model = %self.llm.model_name(),
            cost = %self.llm.estimate_cost(&response),
            output_tokens = response.output_tokens,
            "Extraction reply"
        );

        Ok(parse_json_reply(&response.content)?)
    }
}

#[async_trait]
impl StructuredExtractor for LlmExtractor {
    async fn extract(&self, raw: &Value, schema: &Value) -> Result<Value, LlmError> {
        match self.try_extract(raw, schema).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, "Structured extraction failed");
                Ok(parsing_error_result())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::llm::provider::{CompletionResponse, FinishReason};

    struct FixedLlm(Option<&'static str>);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            assert_eq!(request.temperature, Some(EXTRACT_TEMPERATURE));
            match self.0 {
                Some(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    input_tokens: 50,
                    output_tokens: 20,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                None => Err(LlmError::RateLimited {
                    provider: "fixed".to_string(),
                    retry_after: None,
                }),
            }
        }
    }

    fn schema() -> Value {
        json!({"document_type": "invoice", "total_amount": "number"})
    }

    #[tokio::test]
    async fn returns_parsed_mapping() {
        let extractor = LlmExtractor::new(Arc::new(FixedLlm(Some(
            "```json\n{\"document_type\": \"invoice\", \"total_amount\": 42, \"missing_fields\": []}\n```",
        ))));
        let result = extractor
            .extract(&json!({"kind": "invoice", "sum": 42}), &schema())
            .await
            .unwrap();
        assert_eq!(result["document_type"], "invoice");
        assert_eq!(result["total_amount"], 42);
    }

    #[tokio::test]
    async fn unparseable_reply_degrades() {
        let extractor = LlmExtractor::new(Arc::new(FixedLlm(Some("Sorry, no."))));
        let result = extractor.extract(&json!({}), &schema()).await.unwrap();
        assert_eq!(result, parsing_error_result());
    }

    #[tokio::test]
    async fn array_reply_is_returned_unchanged() {
        let extractor = LlmExtractor::new(Arc::new(FixedLlm(Some(
            r#"[{"document_type": "invoice", "total_amount": 5}]"#,
        ))));
        let result = extractor.extract(&json!({}), &schema()).await.unwrap();
        assert_eq!(result, json!([{"document_type": "invoice", "total_amount": 5}]));
    }

    #[tokio::test]
    async fn provider_error_degrades() {
        let extractor = LlmExtractor::new(Arc::new(FixedLlm(None)));
        let result = extractor.extract(&json!({"a": 1}), &schema()).await.unwrap();
        assert_eq!(result["missing_fields"][0], PARSING_ERROR);
    }

    #[test]
    fn prompt_contains_schema_and_input() {
        let prompt = LlmExtractor::build_prompt(&json!({"vendor": "Acme"}), &schema()).unwrap();
        assert!(prompt.contains("TARGET SCHEMA"));
        assert!(prompt.contains("\"document_type\": \"invoice\""));
        assert!(prompt.contains("\"vendor\": \"Acme\""));
    }
}
