//! tally-ingest: turn statement documents (PDF or plain text) into raw text.

pub mod extractors;
pub mod types;

pub use extractors::{pdf::PdfTextExtractor, plain_text::PlainTextExtractor};
pub use types::DocumentFormat;

use tally_core::AnalysisError;

/// Document bytes in, raw text out. Failures are opaque and terminal for the
/// document.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError>;
}

/// Picks an extractor from the document's leading bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoExtractor;

impl TextExtractor for AutoExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        match DocumentFormat::sniff(bytes) {
            Some(DocumentFormat::Pdf) => PdfTextExtractor.extract_text(bytes),
            Some(DocumentFormat::PlainText) => PlainTextExtractor.extract_text(bytes),
            None => Err(AnalysisError::TextExtraction(
                "unrecognized document format (expected PDF or UTF-8 text)".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_routes_plain_text() {
        let text = AutoExtractor.extract_text(b"Closing balance 5.00").unwrap();
        assert_eq!(text, "Closing balance 5.00");
    }

    #[test]
    fn test_auto_rejects_binary() {
        let err = AutoExtractor.extract_text(&[0x00, 0xff, 0xfe, 0x80]).unwrap_err();
        assert!(matches!(err, AnalysisError::TextExtraction(_)));
    }
}
