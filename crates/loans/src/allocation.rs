//! Repayment allocation.
//!
//! `allocate` walks the unpaid schedule in ascending period order and
//! consumes the payment interest-first, then principal, within each
//! installment before moving to the next. It never mutates the schedule;
//! the caller applies the outcome via `Loan::apply_allocation` and posts
//! the matching journal entry inside its transactional boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanError;
use crate::schedule::Installment;

/// What to do with payment left over after the whole schedule is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// Refuse the payment outright; nothing is applied.
    #[default]
    Reject,
    /// Accept and credit the remainder to a suspense/advance account.
    CreditToSuspense,
}

/// Portion of a payment applied to one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentAllocation {
    pub period: u32,
    pub interest_applied: Decimal,
    pub principal_applied: Decimal,
}

/// Result of allocating one payment across a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub allocations: Vec<InstallmentAllocation>,
    pub interest_total: Decimal,
    pub principal_total: Decimal,
    /// Unconsumed payment; non-zero only under `CreditToSuspense`.
    pub remainder: Decimal,
}

/// Allocate `amount` against the schedule.
///
/// The schedule slice must be in ascending period order (as built by the
/// calculator). Fails with `Overpayment` when the payment exceeds the
/// outstanding schedule and the policy is `Reject`.
pub fn allocate(
    schedule: &[Installment],
    amount: Decimal,
    policy: OverpaymentPolicy,
) -> Result<AllocationOutcome, LoanError> {
    if amount <= Decimal::ZERO {
        return Err(LoanError::invalid_terms("payment amount must be positive"));
    }

    let mut remaining = amount;
    let mut allocations = Vec::new();
    let mut interest_total = Decimal::ZERO;
    let mut principal_total = Decimal::ZERO;

    for installment in schedule {
        if remaining <= Decimal::ZERO {
            break;
        }
        if installment.is_settled() {
            continue;
        }

        let interest_applied = remaining.min(installment.interest_outstanding());
        remaining -= interest_applied;
        let principal_applied = remaining.min(installment.principal_outstanding());
        remaining -= principal_applied;

        if interest_applied > Decimal::ZERO || principal_applied > Decimal::ZERO {
            interest_total += interest_applied;
            principal_total += principal_applied;
            allocations.push(InstallmentAllocation {
                period: installment.period,
                interest_applied,
                principal_applied,
            });
        }
    }

    if remaining > Decimal::ZERO {
        match policy {
            OverpaymentPolicy::Reject => {
                return Err(LoanError::Overpayment { excess: remaining });
            }
            OverpaymentPolicy::CreditToSuspense => {}
        }
    }

    Ok(AllocationOutcome {
        allocations,
        interest_total,
        principal_total,
        remainder: remaining,
    })
}
