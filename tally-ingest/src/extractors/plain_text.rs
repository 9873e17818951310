//! Plain-text statements (already transcribed, e.g. OCR output or `pdftotext`).

use tally_core::AnalysisError;

use crate::TextExtractor;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| AnalysisError::TextExtraction(format!("decode utf-8: {e}")))?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
    }
}
