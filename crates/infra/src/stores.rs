//! Loan persistence port.
//!
//! The engine reads and writes loans only through [`LoanStore`], so the
//! domain never depends on a storage technology. Store methods run inside
//! the engine's state lock; implementations do not need their own
//! synchronization, but a durable implementation must give each engine
//! operation the atomicity the engine's compute-then-commit pattern assumes.

use std::collections::HashMap;

use crediflow_core::LoanId;
use crediflow_loans::Loan;

/// Durable storage for loans.
pub trait LoanStore: Send + Sync {
    /// Fetch a loan by id. Returns an owned copy; the engine commits changes
    /// back via [`upsert`](LoanStore::upsert).
    fn get(&self, id: LoanId) -> Option<Loan>;

    /// Insert or replace a loan.
    fn upsert(&mut self, loan: Loan);
}

/// In-memory loan store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLoanStore {
    loans: HashMap<LoanId, Loan>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }
}

impl LoanStore for InMemoryLoanStore {
    fn get(&self, id: LoanId) -> Option<Loan> {
        self.loans.get(&id).cloned()
    }

    fn upsert(&mut self, loan: Loan) {
        self.loans.insert(loan.id(), loan);
    }
}
