//! Reporting views derived from the journal.
//!
//! Read-only: every report replays committed postings, so a report can never
//! disagree with `balance_of`.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crediflow_core::{AccountId, EntryId};

use crate::account::AccountKind;
use crate::entry::Side;
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// One account's net position in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    /// Net debit position, zero when the account nets to credit.
    pub debit: Decimal,
    /// Net credit position, zero when the account nets to debit.
    pub credit: Decimal,
}

/// Per-account debit/credit columns as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        self.total_debits == self.total_credits
    }
}

/// One journal line on an account statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub entry_id: EntryId,
    pub entry_date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Balance after this line, signed per the account's normal side.
    pub running_balance: Decimal,
}

/// An account's activity over a period, with running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account_id: AccountId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub lines: Vec<StatementLine>,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatementRow {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub balance: Decimal,
}

/// Income and expense activity over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income: Vec<IncomeStatementRow>,
    pub expenses: Vec<IncomeStatementRow>,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
}

impl Ledger {
    /// Net debit/credit position of every account with activity up to
    /// `as_of`. Total debits always equal total credits: reversal pairs are
    /// included and cancel out.
    pub fn trial_balance(&self, as_of: NaiveDate) -> TrialBalance {
        let mut raw: HashMap<AccountId, Decimal> = HashMap::new();
        for entry in self
            .entries()
            .iter()
            .filter(|entry| entry.entry_date <= as_of)
        {
            for posting in &entry.postings {
                *raw.entry(posting.account_id).or_insert(Decimal::ZERO) +=
                    posting.signed_amount();
            }
        }

        let mut rows: Vec<TrialBalanceRow> = raw
            .into_iter()
            .filter_map(|(account_id, net)| {
                let account = self.account(account_id)?;
                Some(TrialBalanceRow {
                    account_id,
                    code: account.code.clone(),
                    name: account.name.clone(),
                    kind: account.kind,
                    debit: if net > Decimal::ZERO {
                        net
                    } else {
                        Decimal::ZERO
                    },
                    credit: if net < Decimal::ZERO {
                        -net
                    } else {
                        Decimal::ZERO
                    },
                })
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debits = rows.iter().map(|r| r.debit).sum();
        let total_credits = rows.iter().map(|r| r.credit).sum();

        TrialBalance {
            as_of,
            rows,
            total_debits,
            total_credits,
        }
    }

    /// Journal activity for one account over `[from, to]` with a running
    /// balance signed per the account's normal side. The closing balance
    /// equals `balance_of(account, Some(to))`.
    pub fn account_statement(
        &self,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountStatement, LedgerError> {
        let account = self
            .account(account_id)
            .ok_or(LedgerError::UnknownAccount(account_id))?;
        let normal = account.kind.normal_side();

        let orient = |raw: Decimal| match normal {
            Side::Debit => raw,
            Side::Credit => -raw,
        };

        let opening_balance = orient(
            self.entries()
                .iter()
                .filter(|entry| entry.entry_date < from)
                .flat_map(|entry| entry.postings.iter())
                .filter(|p| p.account_id == account_id)
                .map(|p| p.signed_amount())
                .sum(),
        );

        let mut running = opening_balance;
        let mut lines = Vec::new();
        for entry in self
            .entries()
            .iter()
            .filter(|entry| entry.entry_date >= from && entry.entry_date <= to)
        {
            for posting in entry.postings.iter().filter(|p| p.account_id == account_id) {
                running += orient(posting.signed_amount());
                lines.push(StatementLine {
                    entry_id: entry.id,
                    entry_date: entry.entry_date,
                    description: entry.description.clone(),
                    debit: match posting.side {
                        Side::Debit => posting.amount,
                        Side::Credit => Decimal::ZERO,
                    },
                    credit: match posting.side {
                        Side::Credit => posting.amount,
                        Side::Debit => Decimal::ZERO,
                    },
                    running_balance: running,
                });
            }
        }

        Ok(AccountStatement {
            account_id,
            from,
            to,
            opening_balance,
            lines,
            closing_balance: running,
        })
    }

    /// Income vs expense activity over `[from, to]`.
    pub fn income_statement(&self, from: NaiveDate, to: NaiveDate) -> IncomeStatement {
        let mut raw: HashMap<AccountId, Decimal> = HashMap::new();
        for entry in self
            .entries()
            .iter()
            .filter(|entry| entry.entry_date >= from && entry.entry_date <= to)
        {
            for posting in &entry.postings {
                *raw.entry(posting.account_id).or_insert(Decimal::ZERO) +=
                    posting.signed_amount();
            }
        }

        let mut income = Vec::new();
        let mut expenses = Vec::new();
        for (account_id, net) in raw {
            let Some(account) = self.account(account_id) else {
                continue;
            };
            let row = |balance: Decimal| IncomeStatementRow {
                account_id,
                code: account.code.clone(),
                name: account.name.clone(),
                balance,
            };
            match account.kind {
                AccountKind::Income => {
                    let balance = -net;
                    if balance != Decimal::ZERO {
                        income.push(row(balance));
                    }
                }
                AccountKind::Expense => {
                    let balance = net;
                    if balance != Decimal::ZERO {
                        expenses.push(row(balance));
                    }
                }
                AccountKind::Asset | AccountKind::Liability | AccountKind::Equity => {}
            }
        }
        income.sort_by(|a, b| a.code.cmp(&b.code));
        expenses.sort_by(|a, b| a.code.cmp(&b.code));

        let total_income: Decimal = income.iter().map(|r| r.balance).sum();
        let total_expenses: Decimal = expenses.iter().map(|r| r.balance).sum();

        IncomeStatement {
            from,
            to,
            income,
            expenses,
            net_income: total_income - total_expenses,
            total_income,
            total_expenses,
        }
    }
}
