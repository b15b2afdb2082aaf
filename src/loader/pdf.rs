//! PDF text extraction.

use std::path::Path;

use serde::Serialize;

use crate::error::LoaderError;
use crate::loader::read_bytes;

/// Extracted text of a PDF, pages in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfContent {
    pub text: String,
}

/// Read a PDF and extract its text.
///
/// Extraction is CPU-bound and runs on the blocking pool.
pub async fn load(path: &Path) -> Result<PdfContent, LoaderError> {
    let bytes = read_bytes(path).await?;
    let owned = path.to_path_buf();

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| LoaderError::Pdf {
            path: owned.clone(),
            reason: format!("extraction task failed: {e}"),
        })?
        .map_err(|e| LoaderError::Pdf {
            path: owned,
            reason: e.to_string(),
        })?;

    Ok(PdfContent { text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn corrupt_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, LoaderError::Pdf { .. }));
    }
}
