use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crediflow_core::{ClientId, LoanId, LoanProductId};

use crate::allocation::AllocationOutcome;
use crate::error::LoanError;
use crate::schedule::{Installment, InstallmentStatus};

/// Loan lifecycle states.
///
/// `Closed`, `Rejected` and `Defaulted` are terminal. Every transition
/// matches exhaustively on this enum so adding a state forces every
/// transition site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Draft,
    PendingApproval,
    Approved,
    Active,
    Closed,
    Rejected,
    Defaulted,
}

impl LoanStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            LoanStatus::Closed | LoanStatus::Rejected | LoanStatus::Defaulted => true,
            LoanStatus::Draft
            | LoanStatus::PendingApproval
            | LoanStatus::Approved
            | LoanStatus::Active => false,
        }
    }
}

/// A loan application and, after disbursement, the running loan.
///
/// The loan exclusively owns its schedule. All mutation goes through the
/// lifecycle methods below; each one either completes the transition or
/// returns `InvalidTransition` leaving the loan untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    client_id: ClientId,
    product_id: LoanProductId,
    /// Requested principal.
    principal: Decimal,
    /// Principal granted at approval; may differ from the request.
    approved_principal: Option<Decimal>,
    /// Percent per repayment period.
    rate: Decimal,
    /// Number of installments.
    term: u32,
    principal_grace: u32,
    interest_grace: u32,
    status: LoanStatus,
    schedule: Vec<Installment>,
    rejection_reason: Option<String>,
    disbursed_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    defaulted_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// New application in `Draft`.
    #[allow(clippy::too_many_arguments)]
    pub fn application(
        id: LoanId,
        client_id: ClientId,
        product_id: LoanProductId,
        principal: Decimal,
        rate: Decimal,
        term: u32,
        principal_grace: u32,
        interest_grace: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            product_id,
            principal,
            approved_principal: None,
            rate,
            term,
            principal_grace,
            interest_grace,
            status: LoanStatus::Draft,
            schedule: Vec::new(),
            rejection_reason: None,
            disbursed_on: None,
            created_at,
            submitted_at: None,
            approved_at: None,
            closed_at: None,
            defaulted_at: None,
        }
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn product_id(&self) -> LoanProductId {
        self.product_id
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    /// Principal to disburse: the approved amount once set, otherwise the
    /// requested one.
    pub fn granted_principal(&self) -> Decimal {
        self.approved_principal.unwrap_or(self.principal)
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn term(&self) -> u32 {
        self.term
    }

    pub fn principal_grace(&self) -> u32 {
        self.principal_grace
    }

    pub fn interest_grace(&self) -> u32 {
        self.interest_grace
    }

    pub fn schedule(&self) -> &[Installment] {
        &self.schedule
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn disbursed_on(&self) -> Option<NaiveDate> {
        self.disbursed_on
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Principal not yet repaid across the schedule.
    pub fn principal_outstanding(&self) -> Decimal {
        self.schedule
            .iter()
            .map(Installment::principal_outstanding)
            .sum()
    }

    /// Interest not yet repaid across the schedule.
    pub fn interest_outstanding(&self) -> Decimal {
        self.schedule
            .iter()
            .map(Installment::interest_outstanding)
            .sum()
    }

    pub fn total_outstanding(&self) -> Decimal {
        self.principal_outstanding() + self.interest_outstanding()
    }

    pub fn is_settled(&self) -> bool {
        !self.schedule.is_empty() && self.schedule.iter().all(Installment::is_settled)
    }

    /// Draft → PendingApproval.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::Draft => {
                self.status = LoanStatus::PendingApproval;
                self.submitted_at = Some(now);
                Ok(())
            }
            LoanStatus::PendingApproval
            | LoanStatus::Approved
            | LoanStatus::Active
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => Err(LoanError::invalid_transition(self.status, "submit")),
        }
    }

    /// PendingApproval → Approved.
    pub fn approve(&mut self, granted: Decimal, now: DateTime<Utc>) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::PendingApproval => {
                self.approved_principal = Some(granted);
                self.status = LoanStatus::Approved;
                self.approved_at = Some(now);
                Ok(())
            }
            LoanStatus::Draft
            | LoanStatus::Approved
            | LoanStatus::Active
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => Err(LoanError::invalid_transition(self.status, "approve")),
        }
    }

    /// PendingApproval → Rejected (terminal).
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::PendingApproval => {
                self.rejection_reason = Some(reason.into());
                self.status = LoanStatus::Rejected;
                Ok(())
            }
            LoanStatus::Draft
            | LoanStatus::Approved
            | LoanStatus::Active
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => Err(LoanError::invalid_transition(self.status, "reject")),
        }
    }

    /// Approved → Active: installs the materialized schedule.
    ///
    /// The matching ledger posting is the engine's responsibility; the two
    /// effects share its transactional boundary.
    pub fn disburse(
        &mut self,
        schedule: Vec<Installment>,
        on: NaiveDate,
    ) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::Approved => {
                if schedule.is_empty() {
                    return Err(LoanError::invalid_terms("schedule must not be empty"));
                }
                self.schedule = schedule;
                self.disbursed_on = Some(on);
                self.status = LoanStatus::Active;
                Ok(())
            }
            LoanStatus::Draft
            | LoanStatus::PendingApproval
            | LoanStatus::Active
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => Err(LoanError::invalid_transition(self.status, "disburse")),
        }
    }

    /// Mark unpaid installments due strictly before `date` as overdue.
    pub fn mark_overdue_before(&mut self, date: NaiveDate) {
        for installment in &mut self.schedule {
            if !installment.is_settled() && installment.due_date < date {
                installment.status = InstallmentStatus::Overdue;
            }
        }
    }

    /// Active → Active, or Active → Closed once every installment settles.
    pub fn apply_allocation(
        &mut self,
        outcome: &AllocationOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::Active => {}
            LoanStatus::Draft
            | LoanStatus::PendingApproval
            | LoanStatus::Approved
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => {
                return Err(LoanError::invalid_transition(self.status, "record a repayment on"));
            }
        }

        for allocation in &outcome.allocations {
            let installment = self
                .schedule
                .iter_mut()
                .find(|i| i.period == allocation.period)
                .ok_or_else(|| {
                    LoanError::invalid_terms(format!(
                        "allocation references unknown period {}",
                        allocation.period
                    ))
                })?;
            installment.interest_paid += allocation.interest_applied;
            installment.principal_paid += allocation.principal_applied;
            installment.status = if installment.is_settled() {
                InstallmentStatus::Paid
            } else {
                InstallmentStatus::Partial
            };
        }

        if self.is_settled() {
            self.status = LoanStatus::Closed;
            self.closed_at = Some(now);
        }
        Ok(())
    }

    /// Active → Defaulted (terminal). The write-off posting is the engine's
    /// responsibility.
    pub fn mark_defaulted(&mut self, now: DateTime<Utc>) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::Active => {
                self.status = LoanStatus::Defaulted;
                self.defaulted_at = Some(now);
                Ok(())
            }
            LoanStatus::Draft
            | LoanStatus::PendingApproval
            | LoanStatus::Approved
            | LoanStatus::Closed
            | LoanStatus::Rejected
            | LoanStatus::Defaulted => {
                Err(LoanError::invalid_transition(self.status, "default"))
            }
        }
    }
}
