//! Content loading: turns a file path into a canonical document.
//!
//! Format detection is by extension only. Each format has its own decoder
//! module; `FileLoader` dispatches between them.

pub mod email;
pub mod json;
pub mod pdf;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::LoaderError;

pub use email::EmailContent;
pub use pdf::PdfContent;

/// Input formats the pipeline recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentFormat {
    Email,
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "JSON")]
    Json,
    Unknown,
}

impl DocumentFormat {
    /// Detect the format from a path's extension, ignoring case.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Self::Json,
            Some("eml") => Self::Email,
            Some("pdf") => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Pdf => "PDF",
            Self::Json => "JSON",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded content of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Email(EmailContent),
    Pdf(PdfContent),
    Json(Value),
}

/// A loaded document ready for classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedDocument {
    pub format: DocumentFormat,
    pub content: DocumentContent,
    /// File name component of the source path.
    pub source_name: String,
}

/// Loads a document from a path.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError>;
}

/// Loader for files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

/// File name component of `path`, or the whole path when it has none.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) async fn read_bytes(path: &Path) -> Result<Vec<u8>, LoaderError> {
    tokio::fs::read(path).await.map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl ContentLoader for FileLoader {
    async fn load(&self, path: &Path) -> Result<LoadedDocument, LoaderError> {
        let format = DocumentFormat::from_path(path);
        let content = match format {
            DocumentFormat::Json => DocumentContent::Json(json::load(path).await?),
            DocumentFormat::Email => DocumentContent::Email(email::load(path).await?),
            DocumentFormat::Pdf => DocumentContent::Pdf(pdf::load(path).await?),
            DocumentFormat::Unknown => {
                return Err(LoaderError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        let source_name = source_name(path);
        debug!(source = %source_name, format = %format, "Loaded document");

        Ok(LoadedDocument {
            format,
            content,
            source_name,
        })
    }
}
