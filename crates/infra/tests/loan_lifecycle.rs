//! End-to-end lifecycle tests: application → approval → disbursement →
//! repayment → closure/default, with the ledger checked at every step.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crediflow_accounting::{AccountKind, EntryDraft, EntrySource, Ledger, Posting, Side};
use crediflow_core::{AccountId, ClientId, FixedClock, LoanProductId};
use crediflow_infra::{
    EngineError, InMemoryClientDirectory, LoanEngine, PostingAccounts, ScheduleRequest, SubmitLoan,
};
use crediflow_loans::{
    AmortizationKind, InstallmentStatus, InterestMethod, LoanError, LoanProduct, LoanStatus,
    OverpaymentPolicy, RepaymentFrequency,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Harness {
    engine: LoanEngine<FixedClock, InMemoryClientDirectory>,
    accounts: PostingAccounts,
    equity: AccountId,
    client: ClientId,
    product: LoanProductId,
}

fn harness_with_policy(policy: OverpaymentPolicy) -> Harness {
    let mut ledger = Ledger::new();
    let cash = ledger
        .register_account("1000", "Cash", AccountKind::Asset)
        .unwrap();
    let receivable = ledger
        .register_account("1100", "Loan receivable", AccountKind::Asset)
        .unwrap();
    let suspense = ledger
        .register_account("2100", "Repayment suspense", AccountKind::Liability)
        .unwrap();
    let equity = ledger
        .register_account("3000", "Capital", AccountKind::Equity)
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
        suspense: Some(suspense),
        overpayment_policy: policy,
    };

    let clients = InMemoryClientDirectory::new();
    let client = ClientId::new();
    clients.register(client);

    let clock = FixedClock(
        date(2025, 6, 1)
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc(),
    );
    let engine = LoanEngine::new(ledger, accounts, clients, clock).unwrap();

    // Seed working capital so the cash account starts funded.
    engine
        .post_entry(EntryDraft::new(
            "initial capital",
            date(2025, 6, 1),
            vec![
                Posting::debit(cash, dec("10000000")),
                Posting::credit(equity, dec("10000000")),
            ],
        ))
        .unwrap();

    let product = LoanProduct {
        id: LoanProductId::new(),
        code: "MICRO-FLAT".to_string(),
        name: "Flat-rate micro loan".to_string(),
        min_principal: dec("10000"),
        max_principal: dec("2000000"),
        min_rate: Decimal::ZERO,
        max_rate: dec("20"),
        min_term: 1,
        max_term: 36,
        interest_method: InterestMethod::Flat,
        amortization: AmortizationKind::EqualInstallments,
        frequency: RepaymentFrequency::Monthly,
    };
    let product = engine.register_product(product).unwrap();

    Harness {
        engine,
        accounts,
        equity,
        client,
        product,
    }
}

fn harness() -> Harness {
    harness_with_policy(OverpaymentPolicy::Reject)
}

fn submit(h: &Harness, principal: &str, rate: &str, term: u32) -> Result<crediflow_core::LoanId, EngineError> {
    h.engine.submit_application(SubmitLoan {
        client_id: h.client,
        product_id: h.product,
        principal: dec(principal),
        rate: dec(rate),
        term,
        principal_grace: 0,
        interest_grace: 0,
    })
}

#[test]
fn disbursement_materializes_schedule_and_posts_entry() {
    let h = harness();
    let loan_id = submit(&h, "1000000", "1", 10).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    let entry_id = h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.status(), LoanStatus::Active);
    assert_eq!(loan.schedule().len(), 10);
    for installment in loan.schedule() {
        assert_eq!(installment.principal_due, dec("100000"));
        assert_eq!(installment.interest_due, dec("10000"));
    }
    assert_eq!(loan.schedule()[0].due_date, date(2025, 8, 1));
    assert_eq!(loan.schedule()[9].due_date, date(2026, 5, 1));

    let entry = h.engine.entry(entry_id).unwrap();
    assert_eq!(entry.source, EntrySource::Disbursement(loan_id));
    assert_eq!(entry.debit_total(), dec("1000000"));
    assert_eq!(entry.debit_total(), entry.credit_total());

    assert_eq!(
        h.engine.balance_of(h.accounts.loan_receivable, None).unwrap(),
        dec("1000000")
    );
    assert_eq!(
        h.engine.balance_of(h.accounts.cash, None).unwrap(),
        dec("9000000")
    );
    assert!(h.engine.trial_balance(date(2025, 12, 31)).unwrap().is_balanced());
}

#[test]
fn full_repayment_splits_the_entry_and_closes_the_loan() {
    let h = harness();
    let loan_id = submit(&h, "100000", "10", 1).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    // Single installment: 100,000 principal + 10,000 interest.
    let receipt = h
        .engine
        .record_repayment(loan_id, dec("110000"), date(2025, 8, 1))
        .unwrap();

    assert_eq!(receipt.interest_paid, dec("10000"));
    assert_eq!(receipt.principal_paid, dec("100000"));
    assert_eq!(receipt.suspense_credited, Decimal::ZERO);
    assert_eq!(receipt.status, LoanStatus::Closed);

    let entry = h.engine.entry(receipt.entry_id).unwrap();
    assert_eq!(entry.source, EntrySource::Repayment(loan_id));
    assert_eq!(entry.debit_total(), dec("110000"));
    let income_credit = entry
        .postings
        .iter()
        .find(|p| p.account_id == h.accounts.interest_income && p.side == Side::Credit)
        .unwrap();
    assert_eq!(income_credit.amount, dec("10000"));
    let receivable_credit = entry
        .postings
        .iter()
        .find(|p| p.account_id == h.accounts.loan_receivable && p.side == Side::Credit)
        .unwrap();
    assert_eq!(receivable_credit.amount, dec("100000"));

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.status(), LoanStatus::Closed);
    assert_eq!(loan.schedule()[0].status, InstallmentStatus::Paid);
    assert_eq!(
        h.engine.balance_of(h.accounts.loan_receivable, None).unwrap(),
        Decimal::ZERO
    );
    assert_eq!(
        h.engine.balance_of(h.accounts.interest_income, None).unwrap(),
        dec("10000")
    );
}

#[test]
fn overpayment_is_rejected_with_no_state_change() {
    let h = harness();
    let loan_id = submit(&h, "100000", "10", 1).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    let entries_before = h.engine.entry_count().unwrap();
    let receivable_before = h
        .engine
        .balance_of(h.accounts.loan_receivable, None)
        .unwrap();

    let err = h
        .engine
        .record_repayment(loan_id, dec("150000"), date(2025, 8, 1))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Loan(LoanError::Overpayment {
            excess: dec("40000"),
        })
    );

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.status(), LoanStatus::Active);
    assert_eq!(loan.schedule()[0].status, InstallmentStatus::Pending);
    assert_eq!(loan.schedule()[0].principal_paid, Decimal::ZERO);
    assert_eq!(h.engine.entry_count().unwrap(), entries_before);
    assert_eq!(
        h.engine
            .balance_of(h.accounts.loan_receivable, None)
            .unwrap(),
        receivable_before
    );
}

#[test]
fn principal_at_product_max_is_accepted_one_cent_above_is_not() {
    let h = harness();

    let at_max = submit(&h, "2000000", "1", 12);
    assert!(at_max.is_ok());

    let above = submit(&h, "2000000.01", "1", 12).unwrap_err();
    assert!(matches!(
        above,
        EngineError::Loan(LoanError::InvalidTerms(_))
    ));
}

#[test]
fn disburse_outside_approved_state_changes_nothing() {
    let h = harness();
    let loan_id = submit(&h, "500000", "1", 6).unwrap();

    let entries_before = h.engine.entry_count().unwrap();
    let err = h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap_err();
    assert_eq!(
        err,
        EngineError::Loan(LoanError::InvalidTransition {
            from: LoanStatus::PendingApproval,
            action: "disburse",
        })
    );

    let loan = h.engine.loan(loan_id).unwrap();
    assert!(loan.schedule().is_empty());
    assert_eq!(loan.status(), LoanStatus::PendingApproval);
    assert_eq!(h.engine.entry_count().unwrap(), entries_before);
}

#[test]
fn repayment_before_disbursement_is_an_invalid_transition() {
    let h = harness();
    let loan_id = submit(&h, "500000", "1", 6).unwrap();
    h.engine.approve(loan_id, None).unwrap();

    let entries_before = h.engine.entry_count().unwrap();
    let err = h
        .engine
        .record_repayment(loan_id, dec("10000"), date(2025, 7, 1))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Loan(LoanError::InvalidTransition {
            from: LoanStatus::Approved,
            action: "record a repayment on",
        })
    );
    assert_eq!(h.engine.entry_count().unwrap(), entries_before);
}

#[test]
fn rejected_application_is_terminal() {
    let h = harness();
    let loan_id = submit(&h, "50000", "1", 6).unwrap();
    h.engine.reject(loan_id, "income not verifiable").unwrap();

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.status(), LoanStatus::Rejected);
    assert_eq!(loan.rejection_reason(), Some("income not verifiable"));

    let err = h.engine.approve(loan_id, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Loan(LoanError::InvalidTransition { .. })
    ));
}

#[test]
fn partial_payments_track_installment_status_and_overdue() {
    let h = harness();
    // Two installments of 100,000 principal + 2,000 interest each.
    let loan_id = submit(&h, "200000", "1", 2).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    // Interest is consumed before principal.
    let receipt = h
        .engine
        .record_repayment(loan_id, dec("1000"), date(2025, 7, 15))
        .unwrap();
    assert_eq!(receipt.interest_paid, dec("1000"));
    assert_eq!(receipt.principal_paid, Decimal::ZERO);
    assert_eq!(receipt.status, LoanStatus::Active);

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.schedule()[0].status, InstallmentStatus::Partial);
    assert_eq!(loan.schedule()[1].status, InstallmentStatus::Pending);

    // Paying after both due dates marks the untouched installment overdue.
    h.engine
        .record_repayment(loan_id, dec("1000"), date(2025, 9, 15))
        .unwrap();
    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.schedule()[0].status, InstallmentStatus::Partial);
    assert_eq!(loan.schedule()[1].status, InstallmentStatus::Overdue);

    // Settling everything closes the loan.
    let outstanding = loan.total_outstanding();
    let receipt = h
        .engine
        .record_repayment(loan_id, outstanding, date(2025, 9, 20))
        .unwrap();
    assert_eq!(receipt.status, LoanStatus::Closed);
    assert_eq!(
        h.engine
            .balance_of(h.accounts.loan_receivable, None)
            .unwrap(),
        Decimal::ZERO
    );
}

#[test]
fn default_moves_remaining_principal_to_losses() {
    let h = harness();
    let loan_id = submit(&h, "200000", "1", 2).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    // One full installment (100,000 principal + 2,000 interest) is repaid.
    h.engine
        .record_repayment(loan_id, dec("102000"), date(2025, 8, 1))
        .unwrap();

    let entry_id = h.engine.mark_defaulted(loan_id).unwrap().unwrap();
    let entry = h.engine.entry(entry_id).unwrap();
    assert_eq!(entry.source, EntrySource::WriteOff(loan_id));
    assert_eq!(entry.debit_total(), dec("100000"));

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.status(), LoanStatus::Defaulted);
    assert_eq!(
        h.engine
            .balance_of(h.accounts.loan_receivable, None)
            .unwrap(),
        Decimal::ZERO
    );
    assert_eq!(
        h.engine
            .balance_of(h.accounts.loan_loss_expense, None)
            .unwrap(),
        dec("100000")
    );

    // Terminal: no further repayments.
    let err = h
        .engine
        .record_repayment(loan_id, dec("1000"), date(2025, 10, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Loan(LoanError::InvalidTransition { .. })
    ));
}

#[test]
fn suspense_policy_accepts_overpayment_and_credits_the_remainder() {
    let h = harness_with_policy(OverpaymentPolicy::CreditToSuspense);
    let loan_id = submit(&h, "100000", "10", 1).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    let receipt = h
        .engine
        .record_repayment(loan_id, dec("120000"), date(2025, 8, 1))
        .unwrap();

    assert_eq!(receipt.interest_paid, dec("10000"));
    assert_eq!(receipt.principal_paid, dec("100000"));
    assert_eq!(receipt.suspense_credited, dec("10000"));
    assert_eq!(receipt.status, LoanStatus::Closed);

    let suspense = h.accounts.suspense.unwrap();
    assert_eq!(h.engine.balance_of(suspense, None).unwrap(), dec("10000"));
    assert!(h.engine.trial_balance(date(2025, 12, 31)).unwrap().is_balanced());
}

#[test]
fn approval_for_a_different_amount_drives_the_disbursed_schedule() {
    let h = harness();
    let loan_id = submit(&h, "1000000", "1", 10).unwrap();
    h.engine.approve(loan_id, Some(dec("800000"))).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    let loan = h.engine.loan(loan_id).unwrap();
    assert_eq!(loan.granted_principal(), dec("800000"));
    assert_eq!(loan.schedule()[0].principal_due, dec("80000"));
    assert_eq!(
        h.engine
            .balance_of(h.accounts.loan_receivable, None)
            .unwrap(),
        dec("800000")
    );
}

#[test]
fn manual_entries_can_be_reversed_exactly_once() {
    let h = harness();
    let cash_before = h.engine.balance_of(h.accounts.cash, None).unwrap();

    let entry = h
        .engine
        .post_entry(EntryDraft::new(
            "capital top-up",
            date(2025, 6, 15),
            vec![
                Posting::debit(h.accounts.cash, dec("5000")),
                Posting::credit(h.equity, dec("5000")),
            ],
        ))
        .unwrap();
    assert_eq!(
        h.engine.balance_of(h.accounts.cash, None).unwrap(),
        cash_before + dec("5000")
    );

    let reversal = h.engine.reverse_entry(entry.id, "posted twice").unwrap();
    assert_eq!(reversal.source, EntrySource::Reversal(entry.id));
    assert_eq!(
        h.engine.balance_of(h.accounts.cash, None).unwrap(),
        cash_before
    );

    let err = h.engine.reverse_entry(entry.id, "again").unwrap_err();
    assert!(matches!(
        err,
        EngineError::Ledger(crediflow_accounting::LedgerError::AlreadyReversed(_))
    ));
}

#[test]
fn preview_schedule_reads_product_terms_without_creating_state() {
    let h = harness();
    let entries_before = h.engine.entry_count().unwrap();

    let (schedule, totals) = h
        .engine
        .preview_schedule(ScheduleRequest {
            product_id: h.product,
            principal: dec("120000"),
            rate: dec("1"),
            term: 12,
            principal_grace: 0,
            interest_grace: 0,
            start: date(2025, 7, 1),
        })
        .unwrap();

    assert_eq!(schedule.len(), 12);
    assert_eq!(totals.principal, dec("120000"));
    assert_eq!(totals.interest, dec("14400"));
    assert_eq!(h.engine.entry_count().unwrap(), entries_before);
}

#[test]
fn lifecycle_keeps_the_books_balanced_and_income_recognized() {
    let h = harness();
    let loan_id = submit(&h, "1000000", "1", 10).unwrap();
    h.engine.approve(loan_id, None).unwrap();
    h.engine.disburse(loan_id, date(2025, 7, 1)).unwrap();

    // Three on-time installments of 110,000 each.
    for month in [8u32, 9, 10] {
        h.engine
            .record_repayment(loan_id, dec("110000"), date(2025, month, 1))
            .unwrap();
    }

    let tb = h.engine.trial_balance(date(2025, 12, 31)).unwrap();
    assert!(tb.is_balanced());

    let income = h
        .engine
        .income_statement(date(2025, 1, 1), date(2025, 12, 31))
        .unwrap();
    assert_eq!(income.total_income, dec("30000"));

    let statement = h
        .engine
        .account_statement(h.accounts.loan_receivable, date(2025, 7, 1), date(2025, 12, 31))
        .unwrap();
    assert_eq!(statement.closing_balance, dec("700000"));
}
