//! Loan engine: the single writer over loans and the ledger.
//!
//! Every operation takes the state write lock, runs **all** fallible
//! validation and pure computation first, and only then applies mutations.
//! An error on any path returns before the first mutation, so a failed
//! call is indistinguishable from one that never happened. The same lock
//! serializes concurrent repayments against one loan and postings against
//! one account.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crediflow_accounting::{
    AccountStatement, EntryDraft, EntrySource, IncomeStatement, JournalEntry, Ledger, Posting,
    TrialBalance,
};
use crediflow_core::{AccountId, ClientId, Clock, EntryId, LoanId, LoanProductId};
use crediflow_loans::{
    Installment, Loan, LoanError, LoanProduct, LoanStatus, ScheduleTerms, ScheduleTotals, allocate,
    build_schedule, schedule_totals,
};

use crate::clients::ClientDirectory;
use crate::config::PostingAccounts;
use crate::error::EngineError;
use crate::stores::{InMemoryLoanStore, LoanStore};

/// A loan application as submitted by the surrounding service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitLoan {
    pub client_id: ClientId,
    pub product_id: LoanProductId,
    pub principal: Decimal,
    /// Percent per repayment period.
    pub rate: Decimal,
    /// Number of installments.
    pub term: u32,
    pub principal_grace: u32,
    pub interest_grace: u32,
}

/// Schedule preview request; touches no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub product_id: LoanProductId,
    pub principal: Decimal,
    pub rate: Decimal,
    pub term: u32,
    pub principal_grace: u32,
    pub interest_grace: u32,
    /// Anticipated disbursement date.
    pub start: NaiveDate,
}

/// What a committed repayment did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentReceipt {
    pub entry_id: EntryId,
    pub interest_paid: Decimal,
    pub principal_paid: Decimal,
    /// Overpayment credited to the suspense account (zero under `Reject`).
    pub suspense_credited: Decimal,
    pub status: LoanStatus,
}

#[derive(Debug)]
struct EngineState<S> {
    ledger: Ledger,
    loans: S,
    products: HashMap<LoanProductId, LoanProduct>,
}

/// Synchronous loan engine.
///
/// Owns the ledger, the loan store and the product catalog behind one
/// `RwLock`: the in-memory realization of the transactional boundary.
/// Durable deployments supply a [`LoanStore`] backed by real storage and an
/// outer transaction with equivalent semantics; the domain crates stay
/// untouched.
#[derive(Debug)]
pub struct LoanEngine<C: Clock, D: ClientDirectory, S: LoanStore = InMemoryLoanStore> {
    state: RwLock<EngineState<S>>,
    accounts: PostingAccounts,
    clients: D,
    clock: C,
}

impl<C: Clock, D: ClientDirectory> LoanEngine<C, D> {
    /// Build an engine over a prepared ledger, storing loans in memory.
    ///
    /// Fails when the posting-account configuration references accounts the
    /// chart does not contain.
    pub fn new(
        ledger: Ledger,
        accounts: PostingAccounts,
        clients: D,
        clock: C,
    ) -> Result<Self, EngineError> {
        Self::with_store(ledger, accounts, clients, InMemoryLoanStore::new(), clock)
    }
}

impl<C: Clock, D: ClientDirectory, S: LoanStore> LoanEngine<C, D, S> {
    /// Build an engine over a prepared ledger and an existing loan store.
    pub fn with_store(
        ledger: Ledger,
        accounts: PostingAccounts,
        clients: D,
        loans: S,
        clock: C,
    ) -> Result<Self, EngineError> {
        accounts.validate(&ledger)?;
        Ok(Self {
            state: RwLock::new(EngineState {
                ledger,
                loans,
                products: HashMap::new(),
            }),
            accounts,
            clients,
            clock,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState<S>>, EngineError> {
        self.state.read().map_err(|_| EngineError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState<S>>, EngineError> {
        self.state.write().map_err(|_| EngineError::Poisoned)
    }

    /// Register a loan product.
    pub fn register_product(&self, product: LoanProduct) -> Result<LoanProductId, EngineError> {
        product.validate()?;
        let mut state = self.write()?;
        let id = product.id;
        state.products.insert(id, product);
        debug!(product_id = %id, "loan product registered");
        Ok(id)
    }

    /// Create a loan application and submit it for approval.
    pub fn submit_application(&self, request: SubmitLoan) -> Result<LoanId, EngineError> {
        if !self.clients.contains(request.client_id) {
            return Err(EngineError::not_found("client", request.client_id));
        }
        let now = self.clock.now();
        let mut state = self.write()?;

        let product = state
            .products
            .get(&request.product_id)
            .ok_or_else(|| EngineError::not_found("loan product", request.product_id))?;
        product.check_terms(request.principal, request.rate, request.term)?;
        if request.principal_grace >= request.term || request.interest_grace >= request.term {
            return Err(
                LoanError::invalid_terms("grace periods must be shorter than the term").into(),
            );
        }

        let mut loan = Loan::application(
            LoanId::new(),
            request.client_id,
            request.product_id,
            request.principal,
            request.rate,
            request.term,
            request.principal_grace,
            request.interest_grace,
            now,
        );
        loan.submit(now)?;
        let id = loan.id();
        state.loans.upsert(loan);

        info!(loan_id = %id, client_id = %request.client_id, principal = %request.principal,
            "loan application submitted");
        Ok(id)
    }

    /// Approve a pending application, optionally for a different amount.
    pub fn approve(&self, loan_id: LoanId, granted: Option<Decimal>) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut loan = state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
        let product = state
            .products
            .get(&loan.product_id())
            .ok_or_else(|| EngineError::not_found("loan product", loan.product_id()))?;

        let granted = granted.unwrap_or(loan.principal());
        product.check_terms(granted, loan.rate(), loan.term())?;

        loan.approve(granted, now)?;
        state.loans.upsert(loan);

        info!(loan_id = %loan_id, granted = %granted, "loan approved");
        Ok(())
    }

    /// Reject a pending application (terminal).
    pub fn reject(&self, loan_id: LoanId, reason: impl Into<String>) -> Result<(), EngineError> {
        let mut state = self.write()?;

        let mut loan = state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
        loan.reject(reason)?;
        state.loans.upsert(loan);

        info!(loan_id = %loan_id, "loan rejected");
        Ok(())
    }

    /// Disburse an approved loan.
    ///
    /// Materializes the full schedule and posts the disbursement entry
    /// (debit loan receivable, credit cash). Both effects commit together
    /// or not at all.
    pub fn disburse(&self, loan_id: LoanId, on: NaiveDate) -> Result<EntryId, EngineError> {
        let now = self.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut loan = state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
        let product = state
            .products
            .get(&loan.product_id())
            .ok_or_else(|| EngineError::not_found("loan product", loan.product_id()))?;

        let terms = ScheduleTerms {
            principal: loan.granted_principal(),
            rate: loan.rate(),
            term: loan.term(),
            start: on,
            interest_method: product.interest_method,
            amortization: product.amortization,
            frequency: product.frequency,
            principal_grace: loan.principal_grace(),
            interest_grace: loan.interest_grace(),
        };

        let schedule = build_schedule(&terms)?;
        loan.disburse(schedule, on)?;

        let amount = loan.granted_principal();
        let draft = EntryDraft::new(
            format!("loan {loan_id} disbursement"),
            on,
            vec![
                Posting::debit(self.accounts.loan_receivable, amount),
                Posting::credit(self.accounts.cash, amount),
            ],
        )
        .with_source(EntrySource::Disbursement(loan_id));

        let entry = state.ledger.post(draft, now)?;
        state.loans.upsert(loan);

        info!(loan_id = %loan_id, amount = %amount, entry_id = %entry.id, "loan disbursed");
        Ok(entry.id)
    }

    /// Record a repayment against an active loan.
    ///
    /// Marks past-due installments overdue, allocates interest-first per
    /// installment, posts exactly one balanced entry for the payment, and
    /// closes the loan when the final installment settles.
    pub fn record_repayment(
        &self,
        loan_id: LoanId,
        amount: Decimal,
        on: NaiveDate,
    ) -> Result<RepaymentReceipt, EngineError> {
        let now = self.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut loan = state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
        if loan.status() != LoanStatus::Active {
            return Err(
                LoanError::invalid_transition(loan.status(), "record a repayment on").into(),
            );
        }

        loan.mark_overdue_before(on);
        let outcome = allocate(loan.schedule(), amount, self.accounts.overpayment_policy)?;
        loan.apply_allocation(&outcome, now)?;

        let mut postings = vec![Posting::debit(self.accounts.cash, amount)];
        if outcome.interest_total > Decimal::ZERO {
            postings.push(Posting::credit(
                self.accounts.interest_income,
                outcome.interest_total,
            ));
        }
        if outcome.principal_total > Decimal::ZERO {
            postings.push(Posting::credit(
                self.accounts.loan_receivable,
                outcome.principal_total,
            ));
        }
        if outcome.remainder > Decimal::ZERO {
            let suspense = self.accounts.suspense.ok_or_else(|| {
                EngineError::Config("suspense account is not configured".to_string())
            })?;
            postings.push(Posting::credit(suspense, outcome.remainder));
        }

        let draft = EntryDraft::new(format!("loan {loan_id} repayment"), on, postings)
            .with_source(EntrySource::Repayment(loan_id));

        let entry = state.ledger.post(draft, now)?;
        let status = loan.status();
        state.loans.upsert(loan);

        info!(loan_id = %loan_id, amount = %amount, interest = %outcome.interest_total,
            principal = %outcome.principal_total, status = ?status, "repayment recorded");
        Ok(RepaymentReceipt {
            entry_id: entry.id,
            interest_paid: outcome.interest_total,
            principal_paid: outcome.principal_total,
            suspense_credited: outcome.remainder,
            status,
        })
    }

    /// Write a delinquent loan off (terminal).
    ///
    /// Triggered by the caller's delinquency policy, not self-detected.
    /// Moves the unpaid principal from the receivable to the loss account;
    /// returns the write-off entry, or `None` when no principal remained.
    pub fn mark_defaulted(&self, loan_id: LoanId) -> Result<Option<EntryId>, EngineError> {
        let now = self.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut loan = state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))?;

        let write_off = loan.principal_outstanding();
        loan.mark_defaulted(now)?;

        let entry_id = if write_off > Decimal::ZERO {
            let draft = EntryDraft::new(
                format!("loan {loan_id} write-off"),
                now.date_naive(),
                vec![
                    Posting::debit(self.accounts.loan_loss_expense, write_off),
                    Posting::credit(self.accounts.loan_receivable, write_off),
                ],
            )
            .with_source(EntrySource::WriteOff(loan_id));
            Some(state.ledger.post(draft, now)?.id)
        } else {
            None
        };
        state.loans.upsert(loan);

        info!(loan_id = %loan_id, write_off = %write_off, "loan defaulted");
        Ok(entry_id)
    }

    /// Compute a schedule for prospective terms without touching state.
    pub fn preview_schedule(
        &self,
        request: ScheduleRequest,
    ) -> Result<(Vec<Installment>, ScheduleTotals), EngineError> {
        let state = self.read()?;
        let product = state
            .products
            .get(&request.product_id)
            .ok_or_else(|| EngineError::not_found("loan product", request.product_id))?;
        product.check_terms(request.principal, request.rate, request.term)?;

        let schedule = build_schedule(&ScheduleTerms {
            principal: request.principal,
            rate: request.rate,
            term: request.term,
            start: request.start,
            interest_method: product.interest_method,
            amortization: product.amortization,
            frequency: product.frequency,
            principal_grace: request.principal_grace,
            interest_grace: request.interest_grace,
        })?;
        let totals = schedule_totals(&schedule);
        Ok((schedule, totals))
    }

    /// Post a manual journal entry on behalf of the service layer.
    pub fn post_entry(&self, draft: EntryDraft) -> Result<JournalEntry, EngineError> {
        let now = self.clock.now();
        let mut state = self.write()?;
        Ok(state.ledger.post(draft, now)?)
    }

    /// Reverse a committed entry; the original stays in the journal.
    pub fn reverse_entry(
        &self,
        entry_id: EntryId,
        reason: impl Into<String>,
    ) -> Result<JournalEntry, EngineError> {
        let now = self.clock.now();
        let mut state = self.write()?;
        Ok(state.ledger.reverse(entry_id, reason, now)?)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan, EngineError> {
        let state = self.read()?;
        state
            .loans
            .get(loan_id)
            .ok_or_else(|| EngineError::not_found("loan", loan_id))
    }

    pub fn product(&self, product_id: LoanProductId) -> Result<LoanProduct, EngineError> {
        let state = self.read()?;
        state
            .products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("loan product", product_id))
    }

    pub fn entry(&self, entry_id: EntryId) -> Result<JournalEntry, EngineError> {
        let state = self.read()?;
        state
            .ledger
            .entry(entry_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("journal entry", entry_id))
    }

    pub fn entry_count(&self) -> Result<usize, EngineError> {
        Ok(self.read()?.ledger.entries().len())
    }

    pub fn balance_of(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, EngineError> {
        let state = self.read()?;
        Ok(state.ledger.balance_of(account_id, as_of)?)
    }

    pub fn trial_balance(&self, as_of: NaiveDate) -> Result<TrialBalance, EngineError> {
        Ok(self.read()?.ledger.trial_balance(as_of))
    }

    pub fn account_statement(
        &self,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountStatement, EngineError> {
        let state = self.read()?;
        Ok(state.ledger.account_statement(account_id, from, to)?)
    }

    pub fn income_statement(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IncomeStatement, EngineError> {
        Ok(self.read()?.ledger.income_statement(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryClientDirectory;
    use crediflow_accounting::AccountKind;
    use crediflow_core::FixedClock;
    use crediflow_loans::OverpaymentPolicy;

    fn fixed_clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
                .and_utc(),
        )
    }

    fn chart() -> (Ledger, PostingAccounts) {
        let mut ledger = Ledger::new();
        let cash = ledger
            .register_account("1000", "Cash", AccountKind::Asset)
            .unwrap();
        let receivable = ledger
            .register_account("1100", "Loan receivable", AccountKind::Asset)
            .unwrap();
        let income = ledger
            .register_account("4000", "Interest income", AccountKind::Income)
            .unwrap();
        let losses = ledger
            .register_account("5000", "Loan losses", AccountKind::Expense)
            .unwrap();
        let accounts = PostingAccounts {
            cash,
            loan_receivable: receivable,
            interest_income: income,
            loan_loss_expense: losses,
            suspense: None,
            overpayment_policy: OverpaymentPolicy::Reject,
        };
        (ledger, accounts)
    }

    #[test]
    fn engine_rejects_unregistered_posting_accounts() {
        let (ledger, mut accounts) = chart();
        accounts.cash = AccountId::new();

        let err = LoanEngine::new(
            ledger,
            accounts,
            InMemoryClientDirectory::new(),
            fixed_clock(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn suspense_policy_requires_a_suspense_account() {
        let (ledger, mut accounts) = chart();
        accounts.overpayment_policy = OverpaymentPolicy::CreditToSuspense;

        let err = LoanEngine::new(
            ledger,
            accounts,
            InMemoryClientDirectory::new(),
            fixed_clock(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn unknown_client_is_reported_as_not_found() {
        let (ledger, accounts) = chart();
        let engine = LoanEngine::new(
            ledger,
            accounts,
            InMemoryClientDirectory::new(),
            fixed_clock(),
        )
        .unwrap();

        let err = engine
            .submit_application(SubmitLoan {
                client_id: ClientId::new(),
                product_id: LoanProductId::new(),
                principal: Decimal::from(100_000),
                rate: Decimal::ONE,
                term: 10,
                principal_grace: 0,
                interest_grace: 0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                entity: "client",
                ..
            }
        ));
    }
}
