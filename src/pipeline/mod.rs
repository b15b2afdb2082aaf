//! Document routing pipeline.
//!
//! Every document flows through:
//! 1. `ContentLoader::load()`: file path to canonical content
//! 2. `IntentClassifier::classify()`: LLM intent and urgency
//! 3. `MemoryStore::log()`: mint the record and thread IDs
//! 4. Format agent: email to CRM payload, JSON to target schema
//!
//! The agents write to the record the router created and never mint IDs.

pub mod email_agent;
pub mod json_agent;
pub mod router;
pub mod types;

pub use email_agent::EmailAgent;
pub use json_agent::JsonAgent;
pub use router::Router;
pub use types::{
    Classification, Intent, IntentClassifier, PipelineOutcome, StructuredExtractor, Urgency,
};
