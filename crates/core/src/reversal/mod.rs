//! Transaction reversal.
//!
//! Deleting a financial transaction undoes every side effect its creation
//! had:
//! - Ledger account balances and balance history
//! - Counter-party aggregates (agents, vendors, customers, pilgrims)
//! - Pilgrim family totals
//! - Operating-expense category rollups
//! - Money-exchange links (best-effort, after commit)
//!
//! The engine only talks to storage through [`ReversalStore`] and
//! [`ReversalSession`]; [`MemoryStore`] is the in-process implementation.

pub mod engine;
pub mod error;
pub mod family;
pub mod memory;
pub mod party;
pub mod plan;
pub mod store;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{AppliedAdjustment, PartyOutcome, ReversalEngine, ReversalOptions, ReversalReport};
pub use error::{ReversalError, StoreError};
pub use family::{FamilyMember, FamilyTotals, recompute_family};
pub use memory::{
    CategoryAggregate, ExchangeLink, FailPoint, LedgerAccount, MemoryState, MemoryStore,
    PartyRecord,
};
pub use party::{PartyDelta, PartyHandle, PartyKey, PartyRule, PartyStore, PartyVariant};
pub use plan::{
    AccountAdjustment, AccountRole, CategoryAdjustment, CategoryTags, PartyReversal, ReversalPlan,
};
pub use store::{ReversalSession, ReversalStore, StoreResult};
pub use types::{
    AdjustmentKind, HistoryEntry, MAX_TRANSACTION_CODE_LEN, PERSONAL_EXPENSE_SCOPE, PartyType,
    TransactionKind, TransactionLookup, TransactionRecord,
};
