//! Shared error types for the foundation crate.

use thiserror::Error;

/// Failure to parse a strongly-typed identifier from its string form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {detail}")]
pub struct InvalidId {
    /// Identifier type name (e.g. `"LoanId"`).
    pub kind: &'static str,
    pub detail: String,
}
