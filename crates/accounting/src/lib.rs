//! Accounting module (chart of accounts + double-entry journal engine).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. The
//! [`Ledger`] owns an append-only journal; account balances derive solely
//! from committed postings.

pub mod account;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod reports;

pub use account::{Account, AccountKind};
pub use entry::{EntryDraft, EntrySource, JournalEntry, Posting, Side};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use reports::{
    AccountStatement, IncomeStatement, IncomeStatementRow, StatementLine, TrialBalance,
    TrialBalanceRow,
};
