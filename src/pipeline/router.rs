//! Classification and routing: the spine of the pipeline.
//!
//! One call takes a path through load → classify → record → dispatch and
//! always returns a [`PipelineOutcome`]. Failures before the record is
//! written leave the store untouched.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::error::PipelineError;
use crate::loader::{ContentLoader, DocumentContent, DocumentFormat, LoadedDocument};
use crate::pipeline::email_agent::EmailAgent;
use crate::pipeline::json_agent::JsonAgent;
use crate::pipeline::types::{
    Classification, IntentClassifier, NotImplemented, PipelineOutcome, StructuredExtractor,
};
use crate::store::{MemoryEntry, MemoryStore, RecordIds};

pub struct Router {
    loader: Arc<dyn ContentLoader>,
    classifier: Arc<dyn IntentClassifier>,
    store: Arc<MemoryStore>,
    email_agent: EmailAgent,
    json_agent: JsonAgent,
}

impl Router {
    pub fn new(
        loader: Arc<dyn ContentLoader>,
        classifier: Arc<dyn IntentClassifier>,
        extractor: Arc<dyn StructuredExtractor>,
        store: Arc<MemoryStore>,
    ) -> Self {
        Self {
            loader,
            classifier,
            email_agent: EmailAgent::new(store.clone()),
            json_agent: JsonAgent::new(extractor, store.clone()),
            store,
        }
    }

    /// Run one document through the pipeline.
    pub async fn classify_and_route(&self, path: &Path) -> PipelineOutcome {
        match self.run(path).await {
            Ok(outcome) => {
                info!(path = %path.display(), outcome = outcome.label(), "Document routed");
                outcome
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Pipeline failed");
                PipelineOutcome::error(e)
            }
        }
    }

    async fn run(&self, path: &Path) -> Result<PipelineOutcome, PipelineError> {
        let doc = self.loader.load(path).await?;
        let text = classification_text(&doc)?;

        let classification = self.classifier.classify(&text).await;
        info!(
            source = %doc.source_name,
            format = %doc.format,
            intent = %classification.intent,
            urgency = %classification.urgency,
            "Classified document"
        );

        let ids = self.record(&doc, classification).await?;

        match doc.content {
            DocumentContent::Email(email) => {
                let out = self
                    .email_agent
                    .process(&email, classification.intent, classification.urgency, &ids)
                    .await?;
                Ok(PipelineOutcome::Email(out))
            }
            DocumentContent::Json(value) => {
                let out = self
                    .json_agent
                    .process(&value, classification.intent, &ids)
                    .await?;
                Ok(PipelineOutcome::Json(out))
            }
            DocumentContent::Pdf(_) => {
                info!(doc_id = %ids.doc_id, "No PDF agent yet, returning marker");
                Ok(PipelineOutcome::NotImplemented(NotImplemented::new(
                    DocumentFormat::Pdf.as_str(),
                    ids,
                )))
            }
        }
    }

    /// Create the document's record and thread.
    async fn record(
        &self,
        doc: &LoadedDocument,
        classification: Classification,
    ) -> Result<RecordIds, PipelineError> {
        let entry = MemoryEntry::new()
            .with_source(&doc.source_name)
            .with_format(doc.format.as_str())
            .with_intent(classification.intent.as_str())
            .with_urgency(classification.urgency.as_str());
        let ids = self.store.log(entry, None, None).await?;
        info!(doc_id = %ids.doc_id, thread_id = %ids.thread_id, "Recorded document");
        Ok(ids)
    }
}

/// Text handed to the classifier. The format tag and content variant must
/// agree.
fn classification_text(doc: &LoadedDocument) -> Result<String, PipelineError> {
    match (doc.format, &doc.content) {
        (DocumentFormat::Email, DocumentContent::Email(email)) => {
            Ok(email.body.clone().unwrap_or_default())
        }
        (DocumentFormat::Pdf, DocumentContent::Pdf(pdf)) => Ok(pdf.text.clone()),
        (DocumentFormat::Json, DocumentContent::Json(value)) => Ok(value.to_string()),
        (format, _) => Err(PipelineError::UnsupportedFormat(format.to_string())),
    }
}
