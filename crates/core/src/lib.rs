//! `crediflow-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the injectable clock port, and decimal money
//! arithmetic helpers shared by the accounting and loan crates.

pub mod clock;
pub mod error;
pub mod id;
pub mod money;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::InvalidId;
pub use id::{AccountId, ClientId, EntryId, LoanId, LoanProductId};
pub use money::{MONEY_SCALE, compound, percent_to_fraction, round_money};
