use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crediflow_core::{AccountId, EntryId, LoanId};

use crate::error::LedgerError;

/// Side of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        }
    }
}

/// One debit or credit line within a journal entry (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account_id: AccountId,
    pub side: Side,
    /// Positive amount; the side carries the sign.
    pub amount: Decimal,
}

impl Posting {
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            side: Side::Debit,
            amount,
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            side: Side::Credit,
            amount,
        }
    }

    /// Raw signed amount: positive for debits, negative for credits.
    pub fn signed_amount(&self) -> Decimal {
        match self.side {
            Side::Debit => self.amount,
            Side::Credit => -self.amount,
        }
    }
}

/// What a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Entry posted directly by the surrounding service layer.
    Manual,
    /// Loan disbursement.
    Disbursement(LoanId),
    /// Loan repayment.
    Repayment(LoanId),
    /// Write-off of a defaulted loan's remaining receivable.
    WriteOff(LoanId),
    /// Correction of a previously committed entry.
    Reversal(EntryId),
}

/// An entry as submitted for posting: no identifier or timestamp yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub description: String,
    pub entry_date: NaiveDate,
    pub postings: Vec<Posting>,
    pub source: EntrySource,
    /// Reference into an external system (receipt number, batch id, ...).
    pub external_ref: Option<String>,
}

impl EntryDraft {
    pub fn new(
        description: impl Into<String>,
        entry_date: NaiveDate,
        postings: Vec<Posting>,
    ) -> Self {
        Self {
            description: description.into(),
            entry_date,
            postings,
            source: EntrySource::Manual,
            external_ref: None,
        }
    }

    pub fn with_source(mut self, source: EntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn debit_total(&self) -> Decimal {
        side_total(&self.postings, Side::Debit)
    }

    pub fn credit_total(&self) -> Decimal {
        side_total(&self.postings, Side::Credit)
    }

    /// Structural validation; account existence is checked by the ledger.
    pub(crate) fn validate(&self) -> Result<(), LedgerError> {
        if self.postings.len() < 2 {
            return Err(LedgerError::EntryTooSmall);
        }
        for posting in &self.postings {
            if posting.amount <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount);
            }
        }
        let debits = self.debit_total();
        let credits = self.credit_total();
        if debits != credits {
            return Err(LedgerError::UnbalancedEntry { debits, credits });
        }
        Ok(())
    }
}

/// A committed, write-once journal entry.
///
/// Corrections are made via reversing entries, never by mutating or deleting
/// a committed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub description: String,
    pub entry_date: NaiveDate,
    pub posted_at: DateTime<Utc>,
    pub postings: Vec<Posting>,
    pub source: EntrySource,
    pub external_ref: Option<String>,
}

impl JournalEntry {
    pub fn debit_total(&self) -> Decimal {
        side_total(&self.postings, Side::Debit)
    }

    pub fn credit_total(&self) -> Decimal {
        side_total(&self.postings, Side::Credit)
    }

    pub fn touches(&self, account_id: AccountId) -> bool {
        self.postings.iter().any(|p| p.account_id == account_id)
    }
}

fn side_total(postings: &[Posting], side: Side) -> Decimal {
    postings
        .iter()
        .filter(|p| p.side == side)
        .map(|p| p.amount)
        .sum()
}
