use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

/// PDF readers accept the `%PDF-` header anywhere in the first 1024 bytes.
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_HEADER_WINDOW: usize = 1024;

impl DocumentFormat {
    /// Guess the format from the leading bytes. `None` when the bytes are
    /// neither a PDF nor valid UTF-8.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let head = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
        if head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
            return Some(DocumentFormat::Pdf);
        }
        if std::str::from_utf8(bytes).is_ok() {
            return Some(DocumentFormat::PlainText);
        }
        None
    }
}
