use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use tally_core::{AnalysisError, AnalysisOutcome, ErrorKind, TransactionKind};
use tally_extract::{
    AnalyzeRequest, Analyzer, ExtractionBackend, FormatPolicy, handle_analyze_request,
};
use tally_ingest::{PlainTextExtractor, TextExtractor};

const STATEMENT_TEXT: &str = "\
FIRST EXAMPLE BANK
Jane Doe, 1 Main St, Springfield
Statement date: 2024-01-31
Opening balance 100.00
01/02 PAYROLL            +50.00   150.00
01/03 COFFEE             -20.00   130.00
01/04 REFUND             +30.00   160.00
Closing balance 160.00
";

const GOOD_REPLY: &str = r#"Here is the extracted data:

```json
{
  "holderName": "Jane Doe",
  "holderAddress": "1 Main St, Springfield",
  "statementDate": "2024-01-31",
  "openingBalance": 100.0,
  "closingBalance": 160.0,
  "transactions": [
    {"id": "1", "date": "2024-01-02", "description": "PAYROLL", "amount": 50.0, "kind": "credit", "runningBalance": 150.0},
    {"id": "2", "date": "2024-01-03", "description": "COFFEE", "amount": 20.0, "kind": "debit", "runningBalance": 130.0},
    {"id": "3", "date": "2024-01-04", "description": "REFUND", "amount": 30.0, "kind": "credit", "runningBalance": 160.0}
  ]
}
```
"#;

enum Reply {
    Text(&'static str),
    Unavailable(&'static str),
}

/// Returns a canned reply and records what it was asked.
struct ScriptedBackend {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedBackend {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match self.reply {
            Reply::Text(t) => Ok(t.to_string()),
            Reply::Unavailable(msg) => Err(AnalysisError::BackendUnavailable(msg.to_string())),
        }
    }
}

/// Fails the test if the pipeline ever reaches the backend.
struct UnreachableBackend;

#[async_trait]
impl ExtractionBackend for UnreachableBackend {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AnalysisError> {
        panic!("extraction backend must not be called");
    }
}

struct BrokenExtractor;

impl TextExtractor for BrokenExtractor {
    fn extract_text(&self, _bytes: &[u8]) -> Result<String, AnalysisError> {
        Err(AnalysisError::TextExtraction("corrupt xref table".to_string()))
    }
}

/// Stands in for a large PDF that takes a while to parse.
struct SlowExtractor;

impl TextExtractor for SlowExtractor {
    fn extract_text(&self, _bytes: &[u8]) -> Result<String, AnalysisError> {
        std::thread::sleep(Duration::from_millis(800));
        Ok(STATEMENT_TEXT.to_string())
    }
}

fn analyzer_with(backend: Arc<dyn ExtractionBackend>) -> Analyzer {
    Analyzer::new(Arc::new(PlainTextExtractor), backend)
}

#[tokio::test]
async fn test_empty_document_never_reaches_backend() {
    let analyzer = analyzer_with(Arc::new(UnreachableBackend));
    let err = analyzer.analyze(&[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_blank_text_never_reaches_backend() {
    let analyzer = analyzer_with(Arc::new(UnreachableBackend));
    let err = analyzer.analyze(b"  \n\t  \n").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_text_extraction_failure_is_terminal() {
    let analyzer = Analyzer::new(Arc::new(BrokenExtractor), Arc::new(UnreachableBackend));
    let err = analyzer.analyze(b"%PDF-1.4 ...").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TextExtraction);
}

#[tokio::test]
async fn test_caller_timeout_fires_during_slow_extraction() {
    let analyzer = Analyzer::new(Arc::new(SlowExtractor), Arc::new(UnreachableBackend));

    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_millis(100), analyzer.analyze(b"abc")).await;

    assert!(result.is_err(), "analysis should have timed out");
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "timeout fired late: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_reconciled_statement_end_to_end() {
    let backend = ScriptedBackend::new(Reply::Text(GOOD_REPLY));
    let analyzer = analyzer_with(backend.clone());

    let record = analyzer.analyze(STATEMENT_TEXT.as_bytes()).await.unwrap();

    assert_eq!(backend.calls(), 1);
    let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains(STATEMENT_TEXT));

    assert_eq!(record.holder_name(), Some("Jane Doe"));
    assert_eq!(record.opening_balance(), 100.0);
    assert_eq!(record.closing_balance(), 160.0);
    assert_eq!(record.computed_closing_balance(), 160.0);
    assert_eq!(record.balance_gap(), 0.0);
    assert!(record.is_reconciled());

    let kinds: Vec<TransactionKind> = record.transactions().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TransactionKind::Credit, TransactionKind::Debit, TransactionKind::Credit]
    );
}

#[tokio::test]
async fn test_unbalanced_statement_is_a_result_not_an_error() {
    let backend = ScriptedBackend::new(Reply::Text(
        r#"{"openingBalance": 100, "closingBalance": 175.5, "transactions": [
            {"date": "2024-01-02", "description": "PAYROLL", "amount": 50, "kind": "credit"}]}"#,
    ));
    let record = analyzer_with(backend).analyze(STATEMENT_TEXT.as_bytes()).await.unwrap();
    assert_eq!(record.computed_closing_balance(), 150.0);
    assert_eq!(record.balance_gap(), 25.5);
    assert!(!record.is_reconciled());
}

#[tokio::test]
async fn test_malformed_reply_strict_is_format_error() {
    let backend = ScriptedBackend::new(Reply::Text("I'm sorry, the statement is unreadable."));
    let analyzer = analyzer_with(backend.clone());

    let err = analyzer.analyze(STATEMENT_TEXT.as_bytes()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtractionFormat);
    assert_eq!(backend.calls(), 1);

    let err = analyzer
        .analyze_outcome(STATEMENT_TEXT.as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtractionFormat);
}

#[tokio::test]
async fn test_malformed_reply_lenient_is_unverified() {
    let backend = ScriptedBackend::new(Reply::Text(r#"{"holderName": "Jane"}"#));
    let analyzer = analyzer_with(backend).with_policy(FormatPolicy::Lenient);

    let outcome = analyzer.analyze_outcome(STATEMENT_TEXT.as_bytes()).await.unwrap();
    match outcome {
        AnalysisOutcome::Unverified(reason) => assert_eq!(reason.kind, ErrorKind::ExtractionFormat),
        AnalysisOutcome::Verified(r) => panic!("expected unverified, got {r:?}"),
    }
}

#[tokio::test]
async fn test_lenient_policy_still_propagates_outages() {
    let backend = ScriptedBackend::new(Reply::Unavailable("anthropic error: 529 overloaded"));
    let analyzer = analyzer_with(backend).with_policy(FormatPolicy::Lenient);

    let err = analyzer
        .analyze_outcome(STATEMENT_TEXT.as_bytes())
        .await
        .unwrap_err();
    match err {
        AnalysisError::BackendUnavailable(msg) => assert_eq!(msg, "anthropic error: 529 overloaded"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_analyses_are_independent() {
    let backend = ScriptedBackend::new(Reply::Text(GOOD_REPLY));
    let analyzer = analyzer_with(backend.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let a = analyzer.clone();
        handles.push(tokio::spawn(async move {
            a.analyze(STATEMENT_TEXT.as_bytes()).await
        }));
    }
    for h in handles {
        let record = h.await.unwrap().unwrap();
        assert!(record.is_reconciled());
    }
    assert_eq!(backend.calls(), 8);
}

#[tokio::test]
async fn test_request_boundary_success() {
    let backend = ScriptedBackend::new(Reply::Text(GOOD_REPLY));
    let analyzer = analyzer_with(backend);

    let req = AnalyzeRequest {
        file_content: base64::engine::general_purpose::STANDARD.encode(STATEMENT_TEXT),
        file_name: "jan.txt".to_string(),
    };
    let resp = handle_analyze_request(&analyzer, req).await;
    assert!(resp.success);
    assert!(resp.verified);

    let v = serde_json::to_value(&resp).unwrap();
    assert_eq!(v["data"]["computedClosingBalance"], 160.0);
    assert_eq!(v["data"]["isReconciled"], true);
    assert_eq!(v["data"]["transactions"][1]["kind"], "debit");
    assert!(v["processingTimeMs"].is_u64());
}

#[tokio::test]
async fn test_request_boundary_empty_upload() {
    let analyzer = analyzer_with(Arc::new(UnreachableBackend));
    let req = AnalyzeRequest {
        file_content: String::new(),
        file_name: "empty.pdf".to_string(),
    };
    let resp = handle_analyze_request(&analyzer, req).await;
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::Input));
    assert!(resp.data.is_none());
}

#[tokio::test]
async fn test_request_boundary_lenient_unverified() {
    let backend = ScriptedBackend::new(Reply::Text("no data"));
    let analyzer = analyzer_with(backend).with_policy(FormatPolicy::Lenient);
    let req = AnalyzeRequest {
        file_content: base64::engine::general_purpose::STANDARD.encode(STATEMENT_TEXT),
        file_name: "jan.txt".to_string(),
    };
    let resp = handle_analyze_request(&analyzer, req).await;
    assert!(resp.success);
    assert!(!resp.verified);
    assert!(resp.data.is_none());
    assert_eq!(
        resp.unverified.map(|u| u.kind),
        Some(ErrorKind::ExtractionFormat)
    );
}
