//! Turning quick actions, uploads and recognized speech into query text

mod document;
mod ocr;
mod quick;

pub use document::{DocumentKind, document_text, read_document};
pub use ocr::{DEFAULT_TESSERACT_CMD, IMAGE_EXTENSIONS, TesseractOcr, is_image_path};
pub use quick::QuickAction;

use serde::{Deserialize, Serialize};

/// Where the text of a question came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    #[default]
    Typed,
    Speech,
    Image,
    Document,
}

impl std::fmt::Display for QuerySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuerySource::Typed => "typed",
            QuerySource::Speech => "speech",
            QuerySource::Image => "image",
            QuerySource::Document => "document",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_source_serializes_snake_case() {
        let json = serde_json::to_string(&QuerySource::Speech).unwrap();
        assert_eq!(json, "\"speech\"");
        let parsed: QuerySource = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(parsed, QuerySource::Document);
        assert_eq!(QuerySource::default(), QuerySource::Typed);
    }
}
