//! Ledger error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crediflow_core::{AccountId, EntryId};

/// Deterministic integrity failures raised by the journal engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An entry draft carried fewer than two postings.
    #[error("journal entry must have at least two postings")]
    EntryTooSmall,

    /// A posting carried a zero or negative amount.
    #[error("posting amount must be positive")]
    NonPositiveAmount,

    /// Debit and credit totals differ.
    #[error("journal entry is unbalanced: debits {debits}, credits {credits}")]
    UnbalancedEntry { debits: Decimal, credits: Decimal },

    /// A posting referenced an account that is not registered.
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Account codes are unique within a chart.
    #[error("duplicate account code: {0}")]
    DuplicateAccountCode(String),

    /// The referenced journal entry does not exist.
    #[error("unknown journal entry: {0}")]
    UnknownEntry(EntryId),

    /// Each entry can be reversed at most once.
    #[error("journal entry already reversed: {0}")]
    AlreadyReversed(EntryId),
}
