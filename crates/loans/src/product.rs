use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crediflow_core::LoanProductId;

use crate::error::LoanError;

/// How interest accrues over the life of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    /// Interest computed on the original principal for every period.
    Flat,
    /// Interest computed each period on the remaining outstanding principal.
    DecliningBalance,
}

/// Sub-policy for declining-balance amortization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationKind {
    /// Constant total payment per period (annuity / EMI).
    EqualInstallments,
    /// Constant principal per period, decreasing interest.
    EqualPrincipal,
}

/// Spacing between consecutive installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl RepaymentFrequency {
    /// Next due date, one frequency unit after `from`.
    ///
    /// `None` only when the result would leave the representable date range.
    pub fn advance(self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            RepaymentFrequency::Daily => from.checked_add_days(Days::new(1)),
            RepaymentFrequency::Weekly => from.checked_add_days(Days::new(7)),
            RepaymentFrequency::Biweekly => from.checked_add_days(Days::new(14)),
            RepaymentFrequency::Monthly => from.checked_add_months(Months::new(1)),
            RepaymentFrequency::Quarterly => from.checked_add_months(Months::new(3)),
            RepaymentFrequency::SemiAnnually => from.checked_add_months(Months::new(6)),
            RepaymentFrequency::Annually => from.checked_add_months(Months::new(12)),
        }
    }
}

/// A loan product: the envelope every loan written against it must fit.
///
/// Immutable once referenced by an active loan; rates are percent per
/// repayment period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub id: LoanProductId,
    /// Short unique code, e.g. `"MICRO-12"`.
    pub code: String,
    pub name: String,
    pub min_principal: Decimal,
    pub max_principal: Decimal,
    pub min_rate: Decimal,
    pub max_rate: Decimal,
    /// Term bounds in periods.
    pub min_term: u32,
    pub max_term: u32,
    pub interest_method: InterestMethod,
    pub amortization: AmortizationKind,
    pub frequency: RepaymentFrequency,
}

impl LoanProduct {
    /// Structural sanity of the product definition itself.
    pub fn validate(&self) -> Result<(), LoanError> {
        if self.min_principal <= Decimal::ZERO || self.min_principal > self.max_principal {
            return Err(LoanError::invalid_terms(
                "product principal bounds must be positive and ordered",
            ));
        }
        if self.min_rate < Decimal::ZERO || self.min_rate > self.max_rate {
            return Err(LoanError::invalid_terms(
                "product rate bounds must be non-negative and ordered",
            ));
        }
        if self.min_term == 0 || self.min_term > self.max_term {
            return Err(LoanError::invalid_terms(
                "product term bounds must be positive and ordered",
            ));
        }
        Ok(())
    }

    /// Check requested terms against the product envelope.
    pub fn check_terms(&self, principal: Decimal, rate: Decimal, term: u32) -> Result<(), LoanError> {
        if principal < self.min_principal || principal > self.max_principal {
            return Err(LoanError::invalid_terms(format!(
                "principal must be between {} and {}",
                self.min_principal, self.max_principal
            )));
        }
        if rate < self.min_rate || rate > self.max_rate {
            return Err(LoanError::invalid_terms(format!(
                "rate must be between {} and {}",
                self.min_rate, self.max_rate
            )));
        }
        if term < self.min_term || term > self.max_term {
            return Err(LoanError::invalid_terms(format!(
                "term must be between {} and {} periods",
                self.min_term, self.max_term
            )));
        }
        Ok(())
    }
}
