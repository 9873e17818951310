//! Request boundary: transport-encoded upload in, serializable response out.

use std::time::Instant;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tally_core::{AnalysisError, AnalysisOutcome, ErrorKind, StatementRecord, UnverifiedReason};
use tracing::{error, info};

use crate::analyzer::Analyzer;

/// Largest accepted upload after decoding.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64 document, optionally as a `data:...;base64,` URL
    pub file_content: String,
    #[serde(default)]
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    /// False when the pipeline ran but could not vouch for the figures.
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StatementRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unverified: Option<UnverifiedReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub processing_time_ms: u64,
}

impl AnalysisResponse {
    fn from_result(result: Result<AnalysisOutcome, AnalysisError>, processing_time_ms: u64) -> Self {
        match result {
            Ok(AnalysisOutcome::Verified(record)) => Self {
                success: true,
                verified: true,
                data: Some(record),
                unverified: None,
                error: None,
                error_kind: None,
                processing_time_ms,
            },
            Ok(AnalysisOutcome::Unverified(reason)) => Self {
                success: true,
                verified: false,
                data: None,
                unverified: Some(reason),
                error: None,
                error_kind: None,
                processing_time_ms,
            },
            Err(e) => Self {
                success: false,
                verified: false,
                data: None,
                unverified: None,
                error: Some(format!("Failed to analyze bank statement: {e}")),
                error_kind: Some(e.kind()),
                processing_time_ms,
            },
        }
    }
}

/// Decode the transport encoding of an upload.
pub fn decode_file_content(file_content: &str) -> Result<Vec<u8>, AnalysisError> {
    let payload = match file_content.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => file_content,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let padding = cleaned.bytes().rev().take_while(|&b| b == b'=').count();
    let decoded_len = (cleaned.len() / 4 * 3).saturating_sub(padding);
    if decoded_len > MAX_DOCUMENT_BYTES {
        return Err(too_large(decoded_len));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| AnalysisError::Input(format!("file content is not valid base64: {e}")))?;

    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(too_large(bytes.len()));
    }
    Ok(bytes)
}

fn too_large(len: usize) -> AnalysisError {
    AnalysisError::Input(format!(
        "document is {len} bytes; the limit is {MAX_DOCUMENT_BYTES}"
    ))
}

/// Run one analysis and package the result with its elapsed time. Never
/// fails: errors become `success: false` responses.
pub async fn handle_analyze_request(analyzer: &Analyzer, req: AnalyzeRequest) -> AnalysisResponse {
    let started = Instant::now();

    let result = match decode_file_content(&req.file_content) {
        Ok(bytes) => analyzer.analyze_outcome(&bytes).await,
        Err(e) => Err(e),
    };

    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(outcome) => info!(
            file = %req.file_name,
            verified = outcome.is_verified(),
            elapsed_ms = elapsed,
            "analyze request done"
        ),
        Err(e) => error!(file = %req.file_name, kind = ?e.kind(), elapsed_ms = elapsed, "{e}"),
    }

    AnalysisResponse::from_result(result, elapsed)
}
