//! Engine error model.

use thiserror::Error;

use crediflow_accounting::LedgerError;
use crediflow_loans::LoanError;

/// Failures surfaced by engine operations.
///
/// Domain errors pass through unchanged; the engine only adds the lookup
/// and configuration failures that belong to its boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A referenced entity could not be resolved.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Loan(#[from] LoanError),

    /// Posting-account configuration does not match the ledger's chart.
    #[error("posting account configuration invalid: {0}")]
    Config(String),

    /// The engine state lock was poisoned by a panicking writer.
    #[error("engine state lock poisoned")]
    Poisoned,
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
