//! PDF statement text extraction via `pdf-extract`.

use std::panic::{self, AssertUnwindSafe};

use tally_core::AnalysisError;
use tracing::debug;

use crate::TextExtractor;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        // pdf-extract panics on some malformed documents instead of erroring.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        match result {
            Ok(Ok(text)) => {
                debug!(bytes = bytes.len(), chars = text.len(), "extracted pdf text");
                Ok(text)
            }
            Ok(Err(e)) => Err(AnalysisError::TextExtraction(format!("read pdf: {e}"))),
            Err(_) => Err(AnalysisError::TextExtraction(
                "read pdf: document is malformed".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_pdf_is_extraction_error() {
        let err = PdfTextExtractor
            .extract_text(b"%PDF-1.4\nthis is not really a pdf")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::TextExtraction(_)));
    }
}
