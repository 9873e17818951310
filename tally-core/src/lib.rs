//! tally-core: statement record types, error taxonomy and the reconciliation engine

pub mod error;
pub mod outcome;
pub mod reconcile;
pub mod statement;

pub use error::{AnalysisError, ConfigError, ErrorKind};
pub use outcome::{AnalysisOutcome, UnverifiedReason};
pub use reconcile::{
    RunningBalanceMismatch, TOLERANCE, compute_closing_balance, reconcile,
    running_balance_mismatches,
};
pub use statement::{CandidateStatement, StatementRecord, Transaction, TransactionKind};
