//! Email agent: turns a parsed email into a CRM-ready payload and records
//! it against the document's existing record.

use std::sync::Arc;

use tracing::info;

use crate::error::PipelineError;
use crate::loader::EmailContent;
use crate::pipeline::types::{CrmPayload, EmailOutput, Intent, Urgency};
use crate::store::{MemoryEntry, MemoryStore, RecordIds};

const AGENT: &str = "EmailAgent";

const UNKNOWN_CONTACT: &str = "unknown";
const UNKNOWN_RECIPIENT: &str = "unknown";
const NO_SUBJECT: &str = "No Subject";
const UNKNOWN_SENDER: &str = "Unknown Sender";
const UNKNOWN_DATE: &str = "Unknown Date";

pub struct EmailAgent {
    store: Arc<MemoryStore>,
}

impl EmailAgent {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Build the delivery and CRM payloads and append both to the record
    /// identified by `ids`.
    pub async fn process(
        &self,
        email: &EmailContent,
        intent: Intent,
        urgency: Urgency,
        ids: &RecordIds,
    ) -> Result<EmailOutput, PipelineError> {
        let output = build_output(email, intent, urgency);
        info!(
            doc_id = %ids.doc_id,
            sender = %output.from,
            "Processing email"
        );

        let entry = MemoryEntry::new()
            .with_serialized("structured_data", &output)
            .and_then(|e| e.with_serialized("crm_payload", &output.crm_payload))
            .map_err(|e| PipelineError::Agent {
                agent: AGENT,
                reason: format!("payload serialization failed: {e}"),
            })?;

        self.store
            .log(entry, Some(&ids.doc_id), Some(&ids.thread_id))
            .await?;

        Ok(output)
    }
}

/// `"<subject> from <sender>"` with placeholders for missing headers.
pub fn summarize(email: &EmailContent) -> String {
    let subject = email.subject.as_deref().unwrap_or(NO_SUBJECT);
    let sender = email.from.as_deref().unwrap_or(UNKNOWN_SENDER);
    format!("{subject} from {sender}")
}

fn build_output(email: &EmailContent, intent: Intent, urgency: Urgency) -> EmailOutput {
    let from = email.from.clone().unwrap_or_else(|| UNKNOWN_CONTACT.to_string());

    let crm_payload = CrmPayload {
        contact_email: from.clone(),
        interaction_type: intent,
        priority: urgency,
        summary: summarize(email),
    };

    EmailOutput {
        from,
        to: email.to.clone().unwrap_or_else(|| UNKNOWN_RECIPIENT.to_string()),
        subject: email.subject.clone().unwrap_or_else(|| NO_SUBJECT.to_string()),
        date: email.date.clone().unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        body: email.body.clone().unwrap_or_default(),
        intent,
        urgency,
        crm_payload,
    }
}
