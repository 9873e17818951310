//! Decoding of free-form backend responses into candidate statements.
//!
//! The backend is asked for a bare JSON object but routinely wraps it in
//! prose or code fences, drifts to older field names, or quotes amounts as
//! strings. Anything that cannot be read unambiguously is an
//! `ExtractionFormat` error; balances are never defaulted to zero.

use std::ops::Range;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tally_core::{AnalysisError, CandidateStatement, Transaction, TransactionKind};
use tracing::debug;

/// Locate the first complete JSON object in `text`.
///
/// Every `{` is tried in order; the first position from which exactly one JSON
/// value parses, and that value is an object, wins. Text after the object is
/// ignored. Truncated or invalid candidates are skipped.
pub fn find_json_object(text: &str) -> Option<(Range<usize>, Map<String, Value>)> {
    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = stream.next() {
            let end = start + stream.byte_offset();
            return Some((start..end, map));
        }
    }
    None
}

/// Backend response text → candidate statement.
pub fn decode_candidate(response: &str) -> Result<CandidateStatement, AnalysisError> {
    let (span, map) = find_json_object(response).ok_or_else(|| {
        AnalysisError::ExtractionFormat("no JSON object found in backend response".to_string())
    })?;

    if span.start > 0 || span.end < response.trim_end().len() {
        debug!(
            start = span.start,
            end = span.end,
            len = response.len(),
            "backend response contained text around the JSON object"
        );
    }

    let wire: WireStatement = serde_json::from_value(Value::Object(map))
        .map_err(|e| AnalysisError::ExtractionFormat(format!("unexpected statement shape: {e}")))?;

    wire.into_candidate()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatement {
    #[serde(default, alias = "accountHolderName")]
    holder_name: Option<String>,
    #[serde(default, alias = "accountHolderAddress")]
    holder_address: Option<String>,
    #[serde(default, alias = "documentDate")]
    statement_date: Option<Value>,
    #[serde(default, alias = "startingBalance")]
    opening_balance: Option<Value>,
    #[serde(default, alias = "endingBalance")]
    closing_balance: Option<Value>,
    #[serde(default)]
    transactions: Option<Vec<WireTransaction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default, alias = "type")]
    kind: Option<String>,
    #[serde(default, alias = "balance")]
    running_balance: Option<Value>,
}

impl WireStatement {
    fn into_candidate(self) -> Result<CandidateStatement, AnalysisError> {
        let opening_balance = required_amount(self.opening_balance.as_ref(), "openingBalance")?;
        let closing_balance = required_amount(self.closing_balance.as_ref(), "closingBalance")?;
        let statement_date = optional_date(self.statement_date.as_ref(), "statementDate")?;

        let transactions = self
            .transactions
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, t)| t.into_transaction(i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CandidateStatement {
            holder_name: clean_text(self.holder_name),
            holder_address: clean_text(self.holder_address),
            statement_date,
            opening_balance,
            closing_balance,
            transactions,
        })
    }
}

impl WireTransaction {
    fn into_transaction(self, index: usize) -> Result<Transaction, AnalysisError> {
        let field = |name: &str| format!("transactions[{index}].{name}");

        let amount = required_amount(self.amount.as_ref(), &field("amount"))?;
        if amount < 0.0 {
            return Err(format_error(
                &field("amount"),
                "must be a non-negative magnitude (direction belongs in kind)",
            ));
        }

        let date = optional_date(self.date.as_ref(), &field("date"))?
            .ok_or_else(|| format_error(&field("date"), "missing"))?;

        let kind = match self.kind.as_deref().map(str::trim) {
            Some(k) if k.eq_ignore_ascii_case("credit") => TransactionKind::Credit,
            Some(k) if k.eq_ignore_ascii_case("debit") => TransactionKind::Debit,
            Some(other) => {
                return Err(format_error(
                    &field("kind"),
                    &format!("expected \"credit\" or \"debit\", got {other:?}"),
                ));
            }
            None => return Err(format_error(&field("kind"), "missing")),
        };

        let running_balance = match self.running_balance.as_ref() {
            None => None,
            Some(v) if is_blank(v) => None,
            Some(v) => Some(parse_amount(v, &field("runningBalance"))?),
        };

        let id = match self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("txn-{}", index + 1),
        };

        Ok(Transaction {
            id,
            date,
            description: self.description.unwrap_or_default(),
            amount,
            kind,
            running_balance,
        })
    }
}

fn format_error(field: &str, problem: &str) -> AnalysisError {
    AnalysisError::ExtractionFormat(format!("{field}: {problem}"))
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:(?P<sign>[-+])\s*\$?|\$\s*(?P<inner>[-+])?)?\s*",
            r"(?P<num>(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|\.\d+)$"
        ))
        .expect("amount regex")
    })
}

fn required_amount(value: Option<&Value>, field: &str) -> Result<f64, AnalysisError> {
    match value {
        Some(v) if !is_blank(v) => parse_amount(v, field),
        _ => Err(format_error(field, "missing")),
    }
}

/// JSON number, or a string like `"1,234.56"`, `"$12.00"`, `"-5"`. At most
/// one sign, either before or after the currency symbol.
fn parse_amount(value: &Value, field: &str) -> Result<f64, AnalysisError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => amount_re().captures(s.trim()).and_then(|caps| {
            let magnitude: f64 = caps["num"].replace(',', "").parse().ok()?;
            let negative = caps.name("sign").map(|m| m.as_str()) == Some("-")
                || caps.name("inner").map(|m| m.as_str()) == Some("-");
            Some(if negative { -magnitude } else { magnitude })
        }),
        _ => None,
    };

    match parsed {
        Some(x) if x.is_finite() => Ok(x),
        _ => Err(format_error(field, &format!("not an amount: {value}"))),
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

fn optional_date(value: Option<&Value>, field: &str) -> Result<Option<NaiveDate>, AnalysisError> {
    let s = match value {
        None => return Ok(None),
        Some(v) if is_blank(v) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(other) => return Err(format_error(field, &format!("not a date: {other}"))),
    };

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(Some)
        .ok_or_else(|| format_error(field, &format!("not a date: {s:?}")))
}

/// `null`, `""` and the `"N/A"` placeholder all mean "not stated".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_placeholder(s),
        _ => false,
    }
}

fn is_placeholder(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case("n/a")
}

fn clean_text(s: Option<String>) -> Option<String> {
    s.filter(|s| !is_placeholder(s)).map(|s| s.trim().to_string())
}
