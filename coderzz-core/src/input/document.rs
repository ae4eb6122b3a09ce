//! Uploaded documents

use std::path::Path;

use crate::error::InputError;

/// Document kinds recognized by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Plain text, or anything without a known binary extension
    Text,
    Pdf,
}

impl DocumentKind {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Text
        }
    }
}

/// Decode an uploaded document into query text.
///
/// PDFs are rejected; anything else must be valid UTF-8.
pub fn document_text(name: &str, bytes: &[u8]) -> Result<String, InputError> {
    if DocumentKind::from_name(name) == DocumentKind::Pdf {
        return Err(InputError::UnsupportedFormat(format!(
            "{name}: PDF documents are not supported, upload a .txt file"
        )));
    }
    std::str::from_utf8(bytes)
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .map_err(|e| InputError::InvalidUtf8(format!("{name}: {e}")))
}

/// Read and decode a document from disk.
pub async fn read_document(path: &Path) -> Result<String, InputError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    document_text(&name, &bytes)
}
