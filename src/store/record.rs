//! Memory entries (writes) and document records (reads).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Field names with a fixed meaning on every record.
pub mod fields {
    pub const SOURCE: &str = "source";
    pub const FORMAT: &str = "format";
    pub const INTENT: &str = "intent";
    pub const URGENCY: &str = "urgency";
    pub const TIMESTAMP: &str = "timestamp";
    pub const THREAD_ID: &str = "thread_id";
}

/// A single write to the memory store.
///
/// The known core fields are typed; format-specific additions go in
/// `extensions`. Only fields that are set are written, so an entry is
/// always a partial update of its record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryEntry {
    pub source: Option<String>,
    pub format: Option<String>,
    pub intent: Option<String>,
    pub urgency: Option<String>,
    pub extensions: BTreeMap<String, Value>,
}

impl MemoryEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_urgency(mut self, urgency: impl Into<String>) -> Self {
        self.urgency = Some(urgency.into());
        self
    }

    /// Add an extension field holding any JSON value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Add an extension field from any serializable value.
    pub fn with_serialized<T: Serialize>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.with_field(name, value))
    }

    /// Flatten into `(field, stored text)` pairs, stamping `timestamp` and
    /// `thread_id` last so they override anything the caller supplied.
    pub(crate) fn into_stored_fields(
        self,
        timestamp: &str,
        thread_id: &str,
    ) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut out: BTreeMap<String, String> = BTreeMap::new();

        let core = [
            (fields::SOURCE, self.source),
            (fields::FORMAT, self.format),
            (fields::INTENT, self.intent),
            (fields::URGENCY, self.urgency),
        ];
        for (name, value) in core {
            if let Some(v) = value {
                out.insert(name.to_string(), v);
            }
        }

        for (name, value) in &self.extensions {
            out.insert(name.clone(), encode_value(value)?);
        }

        out.insert(fields::TIMESTAMP.to_string(), timestamp.to_string());
        out.insert(fields::THREAD_ID.to_string(), thread_id.to_string());

        Ok(out.into_iter().collect())
    }
}

/// Encode a value into its stored text form.
///
/// Strings are stored raw, arrays and objects as compact JSON, other
/// scalars as their JSON text.
pub fn encode_value(value: &Value) -> Result<String, serde_json::Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value),
        other => Ok(other.to_string()),
    }
}

/// Decode stored text. Serialized arrays/objects come back structured;
/// everything else stays a string.
///
/// The stored text carries no type tag, so this is best effort: a string
/// that was written with JSON array or object text (such as `"{}"`)
/// decodes as a structure. Use [`DocumentRecord::extension`] for the raw
/// text.
pub fn decode_value(text: &str) -> Value {
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str::<Value>(text)
    {
        return value;
    }
    Value::String(text.to_string())
}

/// Everything known about one ingested document.
///
/// `thread_id` reflects the most recent write. Thread membership is
/// tracked separately by the store and is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub doc_id: String,
    pub source: Option<String>,
    pub format: Option<String>,
    pub intent: Option<String>,
    pub urgency: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub thread_id: Option<String>,
    pub extensions: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// Build a record from its raw field map.
    pub fn from_fields(doc_id: impl Into<String>, mut raw: BTreeMap<String, String>) -> Self {
        let timestamp = raw.remove(fields::TIMESTAMP).and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        });
        Self {
            doc_id: doc_id.into(),
            source: raw.remove(fields::SOURCE),
            format: raw.remove(fields::FORMAT),
            intent: raw.remove(fields::INTENT),
            urgency: raw.remove(fields::URGENCY),
            timestamp,
            thread_id: raw.remove(fields::THREAD_ID),
            extensions: raw,
        }
    }

    /// Raw stored text of an extension field.
    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).map(String::as_str)
    }

    /// Decoded value of an extension field. Best effort, see
    /// [`decode_value`].
    pub fn extension_value(&self, name: &str) -> Option<Value> {
        self.extensions.get(name).map(|s| decode_value(s))
    }
}
