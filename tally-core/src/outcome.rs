//! Result of one analysis as reported to a caller.

use serde::Serialize;

use crate::error::{AnalysisError, ErrorKind};
use crate::statement::StatementRecord;

/// Either a reconciled record or an explicit "could not verify" marker.
///
/// A failed extraction is never represented as a zero-balance record, so a
/// caller cannot mistake it for a genuine empty statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnalysisOutcome {
    Verified(StatementRecord),
    Unverified(UnverifiedReason),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnverifiedReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for UnverifiedReason {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl AnalysisOutcome {
    pub fn record(&self) -> Option<&StatementRecord> {
        match self {
            AnalysisOutcome::Verified(r) => Some(r),
            AnalysisOutcome::Unverified(_) => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, AnalysisOutcome::Verified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::statement::CandidateStatement;

    #[test]
    fn test_unverified_carries_no_record() {
        let err = AnalysisError::ExtractionFormat("no JSON object in response".into());
        let outcome = AnalysisOutcome::Unverified(UnverifiedReason::from(&err));
        assert!(!outcome.is_verified());
        assert!(outcome.record().is_none());

        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["status"], "unverified");
        assert_eq!(v["kind"], "extractionFormat");
        assert!(v.get("openingBalance").is_none());
    }

    #[test]
    fn test_verified_serializes_record_inline() {
        let outcome = AnalysisOutcome::Verified(reconcile(CandidateStatement::new(0.0, 0.0)));
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["status"], "verified");
        assert_eq!(v["openingBalance"], 0.0);
        assert_eq!(v["isReconciled"], true);
    }
}
