//! JSON agent: normalizes arbitrary JSON onto the invoice-style target
//! schema and records the result.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::llm::extractor::PARSING_ERROR;
use crate::pipeline::types::{Intent, JsonOutput, StructuredExtractor};
use crate::store::{MemoryEntry, MemoryStore, RecordIds};

const AGENT: &str = "JSONAgent";

/// Sentinel placed in `missing_fields` when the extractor returns a
/// non-object.
pub const INVALID_RESULT_FORMAT: &str = "Invalid result format";

const MISSING_FIELDS: &str = "missing_fields";

/// Shape every JSON document is normalized onto.
pub fn target_schema() -> Value {
    json!({
        "document_type": "invoice",
        "document_id": "string",
        "date": "ISO8601",
        "sender": "string",
        "recipient": "string",
        "line_items": [
            {
                "description": "string",
                "quantity": "number",
                "unit_price": "number",
                "total": "number"
            }
        ],
        "total_amount": "number"
    })
}

pub struct JsonAgent {
    extractor: Arc<dyn StructuredExtractor>,
    store: Arc<MemoryStore>,
}

impl JsonAgent {
    pub fn new(extractor: Arc<dyn StructuredExtractor>, store: Arc<MemoryStore>) -> Self {
        Self { extractor, store }
    }

    /// Normalize `parsed` and append the result to the record identified by
    /// `ids`. A failed store write is logged and does not fail the call.
    pub async fn process(
        &self,
        parsed: &Value,
        intent: Intent,
        ids: &RecordIds,
    ) -> Result<JsonOutput, PipelineError> {
        info!(doc_id = %ids.doc_id, "Processing JSON document");

        let output = match self.extractor.extract(parsed, &target_schema()).await {
            Ok(result) => split_result(result),
            Err(e) => {
                warn!(doc_id = %ids.doc_id, error = %e, "Extractor failed");
                JsonOutput {
                    normalized_data: Map::new(),
                    missing_fields: vec![PARSING_ERROR.to_string()],
                }
            }
        };

        let parsed_data = serde_json::to_string(&output.normalized_data).unwrap_or_else(|e| {
            warn!(doc_id = %ids.doc_id, error = %e, "Failed to serialize normalized data");
            "{}".to_string()
        });

        let document_type = output
            .normalized_data
            .get("document_type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let entry = MemoryEntry::new()
            .with_intent(intent.as_str())
            .with_field("type", "JSON")
            .with_field("document_type", document_type)
            .with_field("parsed_data", parsed_data)
            .with_serialized(MISSING_FIELDS, &output.missing_fields)
            .map_err(|e| PipelineError::Agent {
                agent: AGENT,
                reason: format!("payload serialization failed: {e}"),
            })?;

        if let Err(e) = self
            .store
            .log(entry, Some(&ids.doc_id), Some(&ids.thread_id))
            .await
        {
            warn!(doc_id = %ids.doc_id, error = %e, "Failed to record JSON result");
        }

        Ok(output)
    }
}

/// Split an extractor result into normalized data and missing fields.
fn split_result(result: Value) -> JsonOutput {
    let Value::Object(mut map) = result else {
        warn!("Extractor returned a non-object result");
        return JsonOutput {
            normalized_data: Map::new(),
            missing_fields: vec![INVALID_RESULT_FORMAT.to_string()],
        };
    };

    let missing_fields = match map.remove(MISSING_FIELDS) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(field_label).collect(),
        Some(other) => vec![field_label(other)],
    };

    JsonOutput {
        normalized_data: map,
        missing_fields,
    }
}

fn field_label(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
