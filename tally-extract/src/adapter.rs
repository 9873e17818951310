//! Extraction adapter: document text → prompt → backend → candidate statement.

use std::sync::Arc;

use tally_core::{AnalysisError, CandidateStatement};
use tracing::{info, warn};

use crate::backend::ExtractionBackend;
use crate::decode::decode_candidate;
use crate::prompt::{SYSTEM_PROMPT, build_prompt};

#[derive(Clone)]
pub struct ExtractionAdapter {
    backend: Arc<dyn ExtractionBackend>,
}

impl ExtractionAdapter {
    pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
        Self { backend }
    }

    /// Exactly one backend call per invocation, none when `document_text` is
    /// blank.
    pub async fn extract(&self, document_text: &str) -> Result<CandidateStatement, AnalysisError> {
        if document_text.trim().is_empty() {
            return Err(AnalysisError::Input("document text is empty".to_string()));
        }

        let prompt = build_prompt(document_text);
        info!(
            backend = self.backend.name(),
            text_chars = document_text.len(),
            "requesting statement extraction"
        );

        let response = self.backend.complete(SYSTEM_PROMPT, &prompt).await?;

        let candidate = decode_candidate(&response).inspect_err(|e| {
            warn!(backend = self.backend.name(), response_chars = response.len(), "{e}");
        })?;

        info!(
            transactions = candidate.transactions.len(),
            "decoded candidate statement"
        );
        Ok(candidate)
    }
}
