//! Loan domain: products, amortization schedules, lifecycle, repayment
//! allocation.
//!
//! Everything here is pure and deterministic: no stores, no clock, no IO.
//! The infra crate's engine wires these pieces to the ledger inside its
//! transactional boundary.

pub mod allocation;
pub mod error;
pub mod loan;
pub mod product;
pub mod schedule;

pub use allocation::{AllocationOutcome, InstallmentAllocation, OverpaymentPolicy, allocate};
pub use error::LoanError;
pub use loan::{Loan, LoanStatus};
pub use product::{AmortizationKind, InterestMethod, LoanProduct, RepaymentFrequency};
pub use schedule::{
    Installment, InstallmentStatus, ScheduleTerms, ScheduleTotals, build_schedule, schedule_totals,
};
