//! Loan error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::loan::LoanStatus;

/// Deterministic business failures raised by the loan domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoanError {
    /// Terms fall outside the product bounds or are structurally invalid.
    #[error("invalid loan terms: {0}")]
    InvalidTerms(String),

    /// The requested lifecycle action is not available from the current state.
    #[error("cannot {action} a loan in state {from:?}")]
    InvalidTransition {
        from: LoanStatus,
        action: &'static str,
    },

    /// A payment exceeds everything the schedule still owes.
    #[error("payment exceeds outstanding schedule by {excess}")]
    Overpayment { excess: Decimal },
}

impl LoanError {
    pub fn invalid_terms(msg: impl Into<String>) -> Self {
        Self::InvalidTerms(msg.into())
    }

    pub fn invalid_transition(from: LoanStatus, action: &'static str) -> Self {
        Self::InvalidTransition { from, action }
    }
}
