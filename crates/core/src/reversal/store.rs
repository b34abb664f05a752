//! Storage collaborator traits.
//!
//! The engine talks to storage only through these traits. A `ReversalSession`
//! is one atomic unit of work: everything written through it becomes visible
//! on `commit` or disappears on `rollback`. Dropping a session without
//! committing must roll it back.

use async_trait::async_trait;
use chrono::NaiveDate;

use safar_shared::types::{LedgerAccountId, TransactionId};

use crate::reversal::error::StoreError;
use crate::reversal::family::{FamilyMember, FamilyTotals};
use crate::reversal::party::{PartyDelta, PartyHandle, PartyKey, PartyStore};
use crate::reversal::plan::CategoryAdjustment;
use crate::reversal::types::{HistoryEntry, TransactionLookup, TransactionRecord};

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point into a storage backend.
#[async_trait]
pub trait ReversalStore: Send + Sync {
    /// Opens a new unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn ReversalSession>>;

    /// Clears the transaction link on a money-exchange record.
    ///
    /// Runs outside any unit of work. Returns false if no record matched.
    async fn unlink_exchange(
        &self,
        exchange_ref: &str,
        transaction_id: TransactionId,
    ) -> StoreResult<bool>;
}

/// One atomic unit of work.
#[async_trait]
pub trait ReversalSession: Send {
    /// Finds a transaction and locks it until the unit of work ends.
    async fn find_transaction(
        &mut self,
        lookup: &TransactionLookup,
    ) -> StoreResult<Option<TransactionRecord>>;

    /// Adds `entry.amount` to the account balance and appends the entry to its
    /// history. Returns false if the account does not exist.
    async fn adjust_account(
        &mut self,
        account_id: LedgerAccountId,
        entry: &HistoryEntry,
    ) -> StoreResult<bool>;

    /// Finds a party row in one store by one key.
    async fn find_party(
        &mut self,
        store: PartyStore,
        key: &PartyKey,
    ) -> StoreResult<Option<PartyHandle>>;

    /// Applies a delta to a resolved party's aggregates.
    async fn apply_party_delta(&mut self, party: &PartyHandle, delta: &PartyDelta)
    -> StoreResult<()>;

    /// Lists the active members of a family, as seen by this unit of work.
    async fn family_members(
        &mut self,
        store: PartyStore,
        family_id: &str,
    ) -> StoreResult<Vec<FamilyMember>>;

    /// Stores refreshed family totals.
    async fn store_family_totals(&mut self, totals: &FamilyTotals) -> StoreResult<()>;

    /// Applies a category rollup change. Returns false if the category does
    /// not exist.
    async fn adjust_category(
        &mut self,
        adjustment: &CategoryAdjustment,
        updated_on: NaiveDate,
    ) -> StoreResult<bool>;

    /// Deletes the transaction and returns the number of rows removed.
    async fn delete_transaction(&mut self, id: TransactionId) -> StoreResult<u64>;

    /// Makes every write in this unit of work durable.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Discards every write in this unit of work.
    async fn rollback(&mut self) -> StoreResult<()>;
}
