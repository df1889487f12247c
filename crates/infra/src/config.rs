//! Posting-account configuration.

use serde::{Deserialize, Serialize};

use crediflow_accounting::Ledger;
use crediflow_core::AccountId;
use crediflow_loans::OverpaymentPolicy;

use crate::error::EngineError;

/// Accounts the engine posts against, plus the overpayment policy.
///
/// All four core accounts must exist in the ledger's chart; the suspense
/// account is required only under `CreditToSuspense`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAccounts {
    /// Cash / disbursement account (asset).
    pub cash: AccountId,
    /// Loan principal receivable (asset).
    pub loan_receivable: AccountId,
    /// Interest income (income).
    pub interest_income: AccountId,
    /// Write-off destination for defaulted principal (expense).
    pub loan_loss_expense: AccountId,
    /// Overpayment destination (liability), when the policy allows it.
    pub suspense: Option<AccountId>,
    pub overpayment_policy: OverpaymentPolicy,
}

impl PostingAccounts {
    pub(crate) fn validate(&self, ledger: &Ledger) -> Result<(), EngineError> {
        let required = [
            ("cash", self.cash),
            ("loan receivable", self.loan_receivable),
            ("interest income", self.interest_income),
            ("loan loss expense", self.loan_loss_expense),
        ];
        for (name, id) in required {
            if !ledger.contains_account(id) {
                return Err(EngineError::Config(format!(
                    "{name} account is not registered in the ledger"
                )));
            }
        }
        match self.overpayment_policy {
            OverpaymentPolicy::Reject => Ok(()),
            OverpaymentPolicy::CreditToSuspense => match self.suspense {
                Some(id) if ledger.contains_account(id) => Ok(()),
                Some(_) => Err(EngineError::Config(
                    "suspense account is not registered in the ledger".to_string(),
                )),
                None => Err(EngineError::Config(
                    "CreditToSuspense policy requires a suspense account".to_string(),
                )),
            },
        }
    }
}
