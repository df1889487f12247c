use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crediflow_core::{AccountId, EntryId};

use crate::account::{Account, AccountKind};
use crate::entry::{EntryDraft, EntrySource, JournalEntry, Posting, Side};
use crate::error::LedgerError;

/// Double-entry journal engine.
///
/// Owns the chart of accounts and the append-only journal. Balances are
/// cached per account but are always equal to a full replay of that
/// account's postings; `balance_of` with an `as_of` date recomputes from
/// the journal directly.
///
/// The engine itself is a plain value: callers provide the serialization
/// boundary (see the infra crate's engine, which wraps a `Ledger` in its
/// transactional lock).
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    accounts: HashMap<AccountId, Account>,
    codes: HashMap<String, AccountId>,
    journal: Vec<JournalEntry>,
    entry_index: HashMap<EntryId, usize>,
    /// Raw signed balance per account (debit-positive convention).
    balances: HashMap<AccountId, Decimal>,
    /// original entry -> reversing entry
    reversals: HashMap<EntryId, EntryId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account to the chart. Codes are unique; the kind is fixed for
    /// the life of the account.
    pub fn register_account(
        &mut self,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
    ) -> Result<AccountId, LedgerError> {
        let code = code.into();
        if self.codes.contains_key(&code) {
            return Err(LedgerError::DuplicateAccountCode(code));
        }
        let account = Account {
            id: AccountId::new(),
            code: code.clone(),
            name: name.into(),
            kind,
        };
        let id = account.id;
        self.codes.insert(code, id);
        self.accounts.insert(id, account);
        Ok(id)
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn account_by_code(&self, code: &str) -> Option<&Account> {
        self.codes.get(code).and_then(|id| self.accounts.get(id))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn contains_account(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Validate and commit an entry draft.
    ///
    /// Validation runs to completion before the first mutation: a failed
    /// post leaves the journal and every balance untouched.
    pub fn post(
        &mut self,
        draft: EntryDraft,
        posted_at: DateTime<Utc>,
    ) -> Result<JournalEntry, LedgerError> {
        draft.validate()?;
        for posting in &draft.postings {
            if !self.accounts.contains_key(&posting.account_id) {
                return Err(LedgerError::UnknownAccount(posting.account_id));
            }
        }

        let entry = JournalEntry {
            id: EntryId::new(),
            description: draft.description,
            entry_date: draft.entry_date,
            posted_at,
            postings: draft.postings,
            source: draft.source,
            external_ref: draft.external_ref,
        };

        for posting in &entry.postings {
            *self
                .balances
                .entry(posting.account_id)
                .or_insert(Decimal::ZERO) += posting.signed_amount();
        }
        self.entry_index.insert(entry.id, self.journal.len());
        self.journal.push(entry.clone());

        Ok(entry)
    }

    pub fn entry(&self, id: EntryId) -> Option<&JournalEntry> {
        self.entry_index.get(&id).map(|&idx| &self.journal[idx])
    }

    /// All committed entries, in posting order.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Reversing entry for `id`, if one has been posted.
    pub fn reversal_of(&self, id: EntryId) -> Option<EntryId> {
        self.reversals.get(&id).copied()
    }

    /// Signed balance of an account, per its kind's normal side.
    ///
    /// With `as_of: None` the cached running balance is returned; with a
    /// date, the balance is replayed from the journal up to and including
    /// that entry date. Both paths agree by construction (tested).
    pub fn balance_of(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, LedgerError> {
        let account = self
            .accounts
            .get(&account_id)
            .ok_or(LedgerError::UnknownAccount(account_id))?;
        let raw = match as_of {
            None => self
                .balances
                .get(&account_id)
                .copied()
                .unwrap_or(Decimal::ZERO),
            Some(date) => self.replay_raw(account_id, Some(date)),
        };
        Ok(oriented(raw, account.kind))
    }

    /// Raw (debit-positive) balance replayed from the journal.
    pub(crate) fn replay_raw(&self, account_id: AccountId, as_of: Option<NaiveDate>) -> Decimal {
        self.journal
            .iter()
            .filter(|entry| as_of.is_none_or(|date| entry.entry_date <= date))
            .flat_map(|entry| entry.postings.iter())
            .filter(|posting| posting.account_id == account_id)
            .map(Posting::signed_amount)
            .sum()
    }

    /// Correct a committed entry by posting its mirror image.
    ///
    /// Every posting's side is swapped and the new entry references the
    /// original; the original entry is never mutated or removed. An entry
    /// can be reversed at most once.
    pub fn reverse(
        &mut self,
        entry_id: EntryId,
        reason: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Result<JournalEntry, LedgerError> {
        if self.reversals.contains_key(&entry_id) {
            return Err(LedgerError::AlreadyReversed(entry_id));
        }
        let original = self
            .entry(entry_id)
            .ok_or(LedgerError::UnknownEntry(entry_id))?;

        let postings: Vec<Posting> = original
            .postings
            .iter()
            .map(|p| Posting {
                account_id: p.account_id,
                side: p.side.flipped(),
                amount: p.amount,
            })
            .collect();
        let description = format!("reversal of {}: {}", original.id, reason.into());

        let draft = EntryDraft::new(description, posted_at.date_naive(), postings)
            .with_source(EntrySource::Reversal(entry_id));
        let reversal = self.post(draft, posted_at)?;
        self.reversals.insert(entry_id, reversal.id);
        Ok(reversal)
    }
}

/// Orient a raw debit-positive sum to the account kind's normal side.
fn oriented(raw: Decimal, kind: AccountKind) -> Decimal {
    match kind.normal_side() {
        Side::Debit => raw,
        Side::Credit => -raw,
    }
}
