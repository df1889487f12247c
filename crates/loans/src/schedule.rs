//! Interest & schedule calculation.
//!
//! `build_schedule` is a pure function: the same terms always produce the
//! same installment sequence. Monetary components are rounded to two
//! decimal places; the final installment absorbs every rounding remainder
//! so the schedule's principal column sums to the principal exactly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crediflow_core::{compound, percent_to_fraction, round_money};

use crate::error::LoanError;
use crate::product::{AmortizationKind, InterestMethod, RepaymentFrequency};

/// Repayment state of a single installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// One row of an amortization schedule.
///
/// Created in full at disbursement; mutated only by the repayment
/// allocator, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based period index.
    pub period: u32,
    pub due_date: NaiveDate,
    pub principal_due: Decimal,
    pub interest_due: Decimal,
    pub principal_paid: Decimal,
    pub interest_paid: Decimal,
    pub status: InstallmentStatus,
}

impl Installment {
    pub fn new(
        period: u32,
        due_date: NaiveDate,
        principal_due: Decimal,
        interest_due: Decimal,
    ) -> Self {
        Self {
            period,
            due_date,
            principal_due,
            interest_due,
            principal_paid: Decimal::ZERO,
            interest_paid: Decimal::ZERO,
            status: InstallmentStatus::Pending,
        }
    }

    pub fn total_due(&self) -> Decimal {
        self.principal_due + self.interest_due
    }

    pub fn principal_outstanding(&self) -> Decimal {
        self.principal_due - self.principal_paid
    }

    pub fn interest_outstanding(&self) -> Decimal {
        self.interest_due - self.interest_paid
    }

    pub fn total_outstanding(&self) -> Decimal {
        self.principal_outstanding() + self.interest_outstanding()
    }

    pub fn is_settled(&self) -> bool {
        self.total_outstanding() <= Decimal::ZERO
    }
}

/// Inputs to the schedule calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTerms {
    pub principal: Decimal,
    /// Interest rate in percent per repayment period.
    pub rate: Decimal,
    /// Number of installments.
    pub term: u32,
    /// Disbursement date; the first installment falls one period later.
    pub start: NaiveDate,
    pub interest_method: InterestMethod,
    pub amortization: AmortizationKind,
    pub frequency: RepaymentFrequency,
    /// Leading periods with no principal component.
    pub principal_grace: u32,
    /// Leading periods with no interest component.
    pub interest_grace: u32,
}

/// Aggregate obligations of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    pub principal: Decimal,
    pub interest: Decimal,
    pub repayment: Decimal,
}

pub fn schedule_totals(schedule: &[Installment]) -> ScheduleTotals {
    let principal: Decimal = schedule.iter().map(|i| i.principal_due).sum();
    let interest: Decimal = schedule.iter().map(|i| i.interest_due).sum();
    ScheduleTotals {
        principal,
        interest,
        repayment: principal + interest,
    }
}

/// Build the full amortization schedule for the given terms.
pub fn build_schedule(terms: &ScheduleTerms) -> Result<Vec<Installment>, LoanError> {
    validate_terms(terms)?;
    match terms.interest_method {
        InterestMethod::Flat => flat_schedule(terms),
        InterestMethod::DecliningBalance => match terms.amortization {
            AmortizationKind::EqualInstallments => declining_equal_installments(terms),
            AmortizationKind::EqualPrincipal => declining_equal_principal(terms),
        },
    }
}

fn validate_terms(terms: &ScheduleTerms) -> Result<(), LoanError> {
    if terms.principal <= Decimal::ZERO {
        return Err(LoanError::invalid_terms("principal must be positive"));
    }
    if terms.rate < Decimal::ZERO {
        return Err(LoanError::invalid_terms("rate must not be negative"));
    }
    if terms.term == 0 {
        return Err(LoanError::invalid_terms("term must be at least one period"));
    }
    if terms.principal_grace >= terms.term || terms.interest_grace >= terms.term {
        return Err(LoanError::invalid_terms(
            "grace periods must be shorter than the term",
        ));
    }
    Ok(())
}

fn due_dates(terms: &ScheduleTerms) -> Result<Vec<NaiveDate>, LoanError> {
    let mut dates = Vec::with_capacity(terms.term as usize);
    let mut cursor = terms.start;
    for _ in 0..terms.term {
        cursor = terms
            .frequency
            .advance(cursor)
            .ok_or_else(|| LoanError::invalid_terms("due date out of representable range"))?;
        dates.push(cursor);
    }
    Ok(dates)
}

/// Flat interest: every period charges interest on the original principal.
fn flat_schedule(terms: &ScheduleTerms) -> Result<Vec<Installment>, LoanError> {
    let rate = percent_to_fraction(terms.rate);
    let total_interest = terms.principal * rate * Decimal::from(terms.term);

    let principal_periods = Decimal::from(terms.term - terms.principal_grace);
    let interest_periods = Decimal::from(terms.term - terms.interest_grace);
    let per_principal = round_money(terms.principal / principal_periods);
    let per_interest = round_money(total_interest / interest_periods);

    let mut schedule = Vec::with_capacity(terms.term as usize);
    for (idx, due) in due_dates(terms)?.into_iter().enumerate() {
        let period = idx as u32 + 1;
        let principal_due = if period <= terms.principal_grace {
            Decimal::ZERO
        } else {
            per_principal
        };
        let interest_due = if period <= terms.interest_grace {
            Decimal::ZERO
        } else {
            per_interest
        };
        schedule.push(Installment::new(period, due, principal_due, interest_due));
    }

    adjust_final(&mut schedule, terms.principal, round_money(total_interest));
    Ok(schedule)
}

/// Declining balance, constant total payment (annuity).
fn declining_equal_installments(terms: &ScheduleTerms) -> Result<Vec<Installment>, LoanError> {
    let rate = percent_to_fraction(terms.rate);
    let amortizing_periods = terms.term - terms.principal_grace;

    // EMI = P * r * (1+r)^n / ((1+r)^n - 1); zero rate degenerates to P / n.
    let installment_amount = if rate.is_zero() {
        terms.principal / Decimal::from(amortizing_periods)
    } else {
        let factor = compound(rate, amortizing_periods);
        terms.principal * rate * factor / (factor - Decimal::ONE)
    };

    let mut outstanding = terms.principal;
    let mut schedule = Vec::with_capacity(terms.term as usize);
    for (idx, due) in due_dates(terms)?.into_iter().enumerate() {
        let period = idx as u32 + 1;
        let interest_raw = outstanding * rate;
        let interest_due = if period <= terms.interest_grace {
            Decimal::ZERO
        } else {
            round_money(interest_raw)
        };
        let principal_due = if period <= terms.principal_grace {
            Decimal::ZERO
        } else if period == terms.term {
            // Clears the balance exactly; absorbs accumulated rounding.
            outstanding
        } else {
            round_money(installment_amount - interest_raw).min(outstanding)
        };
        outstanding -= principal_due;
        schedule.push(Installment::new(period, due, principal_due, interest_due));
    }

    Ok(schedule)
}

/// Declining balance, constant principal component.
fn declining_equal_principal(terms: &ScheduleTerms) -> Result<Vec<Installment>, LoanError> {
    let rate = percent_to_fraction(terms.rate);
    let amortizing_periods = Decimal::from(terms.term - terms.principal_grace);
    let per_principal = round_money(terms.principal / amortizing_periods);

    let mut outstanding = terms.principal;
    let mut schedule = Vec::with_capacity(terms.term as usize);
    for (idx, due) in due_dates(terms)?.into_iter().enumerate() {
        let period = idx as u32 + 1;
        let interest_due = if period <= terms.interest_grace {
            Decimal::ZERO
        } else {
            round_money(outstanding * rate)
        };
        let principal_due = if period <= terms.principal_grace {
            Decimal::ZERO
        } else if period == terms.term {
            outstanding
        } else {
            per_principal.min(outstanding)
        };
        outstanding -= principal_due;
        schedule.push(Installment::new(period, due, principal_due, interest_due));
    }

    Ok(schedule)
}

/// Shift rounding drift into the final installment so schedule totals hit
/// the exact targets.
fn adjust_final(schedule: &mut [Installment], target_principal: Decimal, target_interest: Decimal) {
    let sum_principal: Decimal = schedule.iter().map(|i| i.principal_due).sum();
    let sum_interest: Decimal = schedule.iter().map(|i| i.interest_due).sum();
    if let Some(last) = schedule.last_mut() {
        last.principal_due += target_principal - sum_principal;
        last.interest_due += target_interest - sum_interest;
    }
}
