//! Error taxonomy shared by every stage of the analysis pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single statement analysis.
///
/// Each variant maps to one [`ErrorKind`] so callers can tell a caller mistake
/// from an unprocessable document or a transient backend outage.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Empty, undecodable or otherwise unusable input. No backend call was made.
    #[error("invalid input: {0}")]
    Input(String),

    /// The document could not be turned into text.
    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    /// The extraction backend was unreachable or answered with an error status.
    #[error("extraction backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered, but its output did not decode to a statement.
    #[error("extraction output malformed: {0}")]
    ExtractionFormat(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Input(_) => ErrorKind::Input,
            AnalysisError::TextExtraction(_) => ErrorKind::TextExtraction,
            AnalysisError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            AnalysisError::ExtractionFormat(_) => ErrorKind::ExtractionFormat,
        }
    }

    /// Only backend outages are worth retrying; the other kinds are
    /// deterministic for a given document.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::BackendUnavailable(_))
    }
}

/// Wire-friendly discriminant of [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Input,
    TextExtraction,
    BackendUnavailable,
    ExtractionFormat,
}

/// Startup-time configuration problems (never raised per request).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {provider} credential (set {env_var} or run `tally auth`)")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
