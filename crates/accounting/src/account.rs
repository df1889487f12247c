use serde::{Deserialize, Serialize};

use crediflow_core::AccountId;

use crate::entry::Side;

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountKind {
    /// Side on which this kind of account grows.
    ///
    /// Asset and Expense accounts are debit-normal; Liability, Equity and
    /// Income accounts are credit-normal.
    pub fn normal_side(self) -> Side {
        match self {
            AccountKind::Asset | AccountKind::Expense => Side::Debit,
            AccountKind::Liability | AccountKind::Equity | AccountKind::Income => Side::Credit,
        }
    }
}

/// A general-ledger account.
///
/// The kind is immutable after registration; the balance is derived from
/// postings and never stored on the account itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Chart code, e.g. `"1100"`. Unique within a ledger.
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_sides_follow_the_convention() {
        assert_eq!(AccountKind::Asset.normal_side(), Side::Debit);
        assert_eq!(AccountKind::Expense.normal_side(), Side::Debit);
        assert_eq!(AccountKind::Liability.normal_side(), Side::Credit);
        assert_eq!(AccountKind::Equity.normal_side(), Side::Credit);
        assert_eq!(AccountKind::Income.normal_side(), Side::Credit);
    }
}
