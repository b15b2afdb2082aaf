//! Shared types for the document routing pipeline.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LlmError;
use crate::store::RecordIds;

// ── Classification ──────────────────────────────────────────────────

/// Business intent of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Intent {
    #[serde(rename = "RFQ")]
    Rfq,
    Invoice,
    Complaint,
    Regulation,
    General,
    Other,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfq => "RFQ",
            Self::Invoice => "Invoice",
            Self::Complaint => "Complaint",
            Self::Regulation => "Regulation",
            Self::General => "General",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a model-produced label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "rfq" => Self::Rfq,
            "invoice" => Self::Invoice,
            "complaint" => Self::Complaint,
            "regulation" => Self::Regulation,
            "general" => Self::General,
            "other" => Self::Other,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How quickly a document needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
    Unknown,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a model-produced label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent and urgency assigned to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub urgency: Urgency,
}

impl Classification {
    pub fn new(intent: Intent, urgency: Urgency) -> Self {
        Self { intent, urgency }
    }

    /// The fallback used when classification fails.
    pub fn unknown() -> Self {
        Self::new(Intent::Unknown, Urgency::Unknown)
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::unknown()
    }
}

// ── Collaborator traits ─────────────────────────────────────────────

/// Assigns intent and urgency to free text.
///
/// Infallible by contract: implementations degrade to
/// [`Classification::unknown`] instead of returning an error.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Classification;
}

/// Maps an arbitrary JSON document onto a target schema.
///
/// A successful result is a mapping of schema fields, optionally carrying
/// a `missing_fields` array.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, raw: &Value, schema: &Value) -> Result<Value, LlmError>;
}

// ── Agent outputs ───────────────────────────────────────────────────

/// Contact-management payload produced for each email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrmPayload {
    pub contact_email: String,
    pub interaction_type: Intent,
    pub priority: Urgency,
    pub summary: String,
}

/// Structured result of the email agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailOutput {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub body: String,
    pub intent: Intent,
    pub urgency: Urgency,
    pub crm_payload: CrmPayload,
}

/// Structured result of the JSON agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonOutput {
    pub normalized_data: Map<String, Value>,
    pub missing_fields: Vec<String>,
}

/// Marker returned for formats that are classified and recorded but have
/// no agent yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotImplemented {
    pub status: String,
    pub format: String,
    pub doc_id: String,
    pub thread_id: String,
}

impl NotImplemented {
    pub fn new(format: impl Into<String>, ids: RecordIds) -> Self {
        Self {
            status: "not_implemented".to_string(),
            format: format.into(),
            doc_id: ids.doc_id,
            thread_id: ids.thread_id,
        }
    }
}

/// Final result of one pipeline run, serialized as-is to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Email(EmailOutput),
    Json(JsonOutput),
    NotImplemented(NotImplemented),
    Error { error: String },
}

impl PipelineOutcome {
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            error: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Json(_) => "json",
            Self::NotImplemented(_) => "not_implemented",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn intent_labels_are_case_insensitive() {
        assert_eq!(Intent::from_label("rfq"), Intent::Rfq);
        assert_eq!(Intent::from_label(" Invoice "), Intent::Invoice);
        assert_eq!(Intent::from_label("Partnership"), Intent::Unknown);
        assert_eq!(Urgency::from_label("HIGH"), Urgency::High);
        assert_eq!(Urgency::from_label("critical"), Urgency::Unknown);
    }

    #[test]
    fn intent_serializes_as_label() {
        assert_eq!(serde_json::to_value(Intent::Rfq).unwrap(), json!("RFQ"));
        assert_eq!(serde_json::to_value(Urgency::Medium).unwrap(), json!("Medium"));
        assert_eq!(Intent::Complaint.to_string(), "Complaint");
    }

    #[test]
    fn classification_defaults_to_unknown() {
        let c = Classification::default();
        assert_eq!(c.intent, Intent::Unknown);
        assert_eq!(c.urgency, Urgency::Unknown);
    }

    #[test]
    fn outcome_serializes_untagged() {
        let marker = PipelineOutcome::NotImplemented(NotImplemented::new(
            "PDF",
            RecordIds {
                doc_id: "pdf_a.pdf_1234abcd".to_string(),
                thread_id: "t-1".to_string(),
            },
        ));
        assert_eq!(
            serde_json::to_value(&marker).unwrap(),
            json!({
                "status": "not_implemented",
                "format": "PDF",
                "doc_id": "pdf_a.pdf_1234abcd",
                "thread_id": "t-1"
            })
        );

        let err = PipelineOutcome::error("boom");
        assert!(err.is_error());
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "boom"}));
    }
}
