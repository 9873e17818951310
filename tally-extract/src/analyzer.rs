//! The full pipeline for one document: text extraction, backend extraction,
//! reconciliation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_core::{AnalysisError, AnalysisOutcome, StatementRecord, UnverifiedReason, reconcile};
use tally_ingest::TextExtractor;
use tracing::{info, warn};

use crate::adapter::ExtractionAdapter;
use crate::backend::ExtractionBackend;

/// What to do when the backend answers with something undecodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatPolicy {
    /// Surface `ExtractionFormat` as an error.
    #[default]
    Strict,
    /// Report it as `AnalysisOutcome::Unverified`.
    Lenient,
}

/// Holds only immutable collaborators, so one instance can serve any number
/// of concurrent analyses. No timeout is applied here; wrap `analyze` in
/// `tokio::time::timeout` if one is needed.
#[derive(Clone)]
pub struct Analyzer {
    extractor: Arc<dyn TextExtractor>,
    adapter: ExtractionAdapter,
    policy: FormatPolicy,
}

impl Analyzer {
    pub fn new(extractor: Arc<dyn TextExtractor>, backend: Arc<dyn ExtractionBackend>) -> Self {
        Self {
            extractor,
            adapter: ExtractionAdapter::new(backend),
            policy: FormatPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FormatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FormatPolicy {
        self.policy
    }

    pub async fn analyze(&self, document: &[u8]) -> Result<StatementRecord, AnalysisError> {
        if document.is_empty() {
            return Err(AnalysisError::Input("document is empty".to_string()));
        }

        let text = self.extract_text(document).await?;
        let candidate = self.adapter.extract(&text).await?;
        let record = reconcile(candidate);

        info!(
            transactions = record.transactions().len(),
            computed = record.computed_closing_balance(),
            gap = record.balance_gap(),
            reconciled = record.is_reconciled(),
            "statement analyzed"
        );
        Ok(record)
    }

    /// PDF parsing is CPU-bound; run it on the blocking pool so the caller's
    /// timeout and other analyses keep making progress.
    async fn extract_text(&self, document: &[u8]) -> Result<String, AnalysisError> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = document.to_vec();
        tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| AnalysisError::TextExtraction(format!("extractor task failed: {e}")))?
    }

    /// [`Analyzer::analyze`] with the configured [`FormatPolicy`] applied.
    pub async fn analyze_outcome(&self, document: &[u8]) -> Result<AnalysisOutcome, AnalysisError> {
        match self.analyze(document).await {
            Ok(record) => Ok(AnalysisOutcome::Verified(record)),
            Err(e @ AnalysisError::ExtractionFormat(_)) if self.policy == FormatPolicy::Lenient => {
                warn!("reporting unverified result: {e}");
                Ok(AnalysisOutcome::Unverified(UnverifiedReason::from(&e)))
            }
            Err(e) => Err(e),
        }
    }
}
