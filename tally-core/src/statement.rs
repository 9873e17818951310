//! Statement record types: what the extraction backend yields and what the
//! pipeline returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a posted movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Increases the balance
    Credit,
    /// Decreases the balance
    Debit,
}

impl TransactionKind {
    /// Signed contribution of `amount` to the running balance.
    pub fn apply(self, amount: f64) -> f64 {
        match self {
            TransactionKind::Credit => amount,
            TransactionKind::Debit => -amount,
        }
    }
}

/// One posted movement on the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Display key (`txn-<n>` when the statement does not carry one)
    pub id: String,
    /// Posting date (YYYY-MM-DD)
    pub date: NaiveDate,
    pub description: String,
    /// Magnitude only; always >= 0. Direction lives in `kind`.
    pub amount: f64,
    pub kind: TransactionKind,
    /// Balance printed next to this row, if the statement has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_balance: Option<f64>,
}

impl Transaction {
    pub fn signed_amount(&self) -> f64 {
        self.kind.apply(self.amount)
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TransactionKind::Credit
    }
}

/// Statement as declared by the document, before reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStatement {
    pub holder_name: Option<String>,
    pub holder_address: Option<String>,
    pub statement_date: Option<NaiveDate>,
    pub opening_balance: f64,
    pub closing_balance: f64,
    /// Document order; never re-sorted
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl CandidateStatement {
    pub fn new(opening_balance: f64, closing_balance: f64) -> Self {
        Self {
            holder_name: None,
            holder_address: None,
            statement_date: None,
            opening_balance,
            closing_balance,
            transactions: Vec::new(),
        }
    }

    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = transactions;
        self
    }
}

/// Final, reconciled statement.
///
/// Only [`crate::reconcile`] builds one, so the derived balances always agree
/// with the declared balances and the transaction list. Fields are read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRecord {
    holder_name: Option<String>,
    holder_address: Option<String>,
    statement_date: Option<NaiveDate>,
    opening_balance: f64,
    closing_balance: f64,
    transactions: Vec<Transaction>,
    computed_closing_balance: f64,
    balance_gap: f64,
    is_reconciled: bool,
}

impl StatementRecord {
    pub(crate) fn from_parts(
        candidate: CandidateStatement,
        computed_closing_balance: f64,
        balance_gap: f64,
        is_reconciled: bool,
    ) -> Self {
        Self {
            holder_name: candidate.holder_name,
            holder_address: candidate.holder_address,
            statement_date: candidate.statement_date,
            opening_balance: candidate.opening_balance,
            closing_balance: candidate.closing_balance,
            transactions: candidate.transactions,
            computed_closing_balance,
            balance_gap,
            is_reconciled,
        }
    }

    pub fn holder_name(&self) -> Option<&str> {
        self.holder_name.as_deref()
    }

    pub fn holder_address(&self) -> Option<&str> {
        self.holder_address.as_deref()
    }

    pub fn statement_date(&self) -> Option<NaiveDate> {
        self.statement_date
    }

    pub fn opening_balance(&self) -> f64 {
        self.opening_balance
    }

    pub fn closing_balance(&self) -> f64 {
        self.closing_balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn computed_closing_balance(&self) -> f64 {
        self.computed_closing_balance
    }

    pub fn balance_gap(&self) -> f64 {
        self.balance_gap
    }

    pub fn is_reconciled(&self) -> bool {
        self.is_reconciled
    }

    /// Sum of credit amounts.
    pub fn total_credits(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.is_credit())
            .map(|t| t.amount)
            .sum()
    }

    /// Sum of debit amounts (as a positive magnitude).
    pub fn total_debits(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| !t.is_credit())
            .map(|t| t.amount)
            .sum()
    }
}
