//! Reconciliation engine: replay transactions against the opening balance and
//! compare with the declared closing balance.

use tracing::debug;

use crate::statement::{CandidateStatement, StatementRecord, Transaction};

/// Largest gap still counted as reconciled (exclusive). One cent absorbs
/// floating-point noise, not genuine discrepancies.
pub const TOLERANCE: f64 = 0.01;

/// Opening balance plus the signed sum of all transactions.
pub fn compute_closing_balance(opening_balance: f64, transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .fold(opening_balance, |acc, t| acc + t.signed_amount())
}

/// Annotate a candidate with its computed closing balance, gap and reconciled
/// flag. Total: every input produces a record.
pub fn reconcile(candidate: CandidateStatement) -> StatementRecord {
    let computed = compute_closing_balance(candidate.opening_balance, &candidate.transactions);
    let gap = (computed - candidate.closing_balance).abs();
    let is_reconciled = gap < TOLERANCE;

    debug!(
        transactions = candidate.transactions.len(),
        computed, gap, is_reconciled, "reconciled statement"
    );

    StatementRecord::from_parts(candidate, computed, gap, is_reconciled)
}

/// A row whose printed running balance disagrees with the replayed one.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningBalanceMismatch {
    /// Position in document order (0-based)
    pub index: usize,
    pub transaction_id: String,
    pub stated: f64,
    pub replayed: f64,
}

/// Rows whose stated running balance is off by at least [`TOLERANCE`].
///
/// Diagnostic only: points at where a statement starts to diverge. Rows
/// without a stated balance are skipped.
pub fn running_balance_mismatches(record: &StatementRecord) -> Vec<RunningBalanceMismatch> {
    let mut running = record.opening_balance();
    let mut out = Vec::new();

    for (index, t) in record.transactions().iter().enumerate() {
        running += t.signed_amount();
        if let Some(stated) = t.running_balance {
            if (stated - running).abs() >= TOLERANCE {
                out.push(RunningBalanceMismatch {
                    index,
                    transaction_id: t.id.clone(),
                    stated,
                    replayed: running,
                });
            }
        }
    }

    out
}
