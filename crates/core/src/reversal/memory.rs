//! In-memory reversal store.
//!
//! Backs unit tests and local tooling. A unit of work holds the whole state
//! behind one async mutex and keeps a snapshot taken at `begin`; rollback, or
//! dropping the session without committing, restores the snapshot. Faults and
//! per-call latency can be injected to exercise failure and cancellation
//! paths.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use safar_shared::types::{ExchangeId, ExpenseCategoryId, LedgerAccountId, PartyId, TransactionId};

use crate::reversal::error::StoreError;
use crate::reversal::family::{FamilyMember, FamilyTotals};
use crate::reversal::party::{PartyDelta, PartyHandle, PartyKey, PartyStore};
use crate::reversal::plan::CategoryAdjustment;
use crate::reversal::store::{ReversalSession, ReversalStore, StoreResult};
use crate::reversal::types::{
    AdjustmentKind, HistoryEntry, TransactionLookup, TransactionRecord,
};

/// Store call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Opening a unit of work.
    Begin,
    /// Reading the transaction.
    FindTransaction,
    /// Adjusting a ledger account.
    AdjustAccount,
    /// Looking up a party.
    FindParty,
    /// Applying a party delta.
    ApplyPartyDelta,
    /// Reading family members.
    FamilyMembers,
    /// Writing family totals.
    StoreFamilyTotals,
    /// Adjusting a category rollup.
    AdjustCategory,
    /// Deleting the transaction.
    DeleteTransaction,
    /// Delete succeeds but reports zero rows.
    DeleteNoRows,
    /// Committing.
    Commit,
    /// Unlinking a money-exchange record.
    UnlinkExchange,
}

/// A balance-bearing account.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerAccount {
    /// Account id.
    pub id: LedgerAccountId,
    /// Display name.
    pub name: String,
    /// Current balance.
    pub balance: Decimal,
    /// Append-only balance history.
    pub history: Vec<HistoryEntry>,
}

impl LedgerAccount {
    /// Creates an account whose history starts with an opening entry.
    #[must_use]
    pub fn with_opening_balance(name: impl Into<String>, balance: Decimal) -> Self {
        let mut account = Self {
            id: LedgerAccountId::new(),
            name: name.into(),
            balance: Decimal::ZERO,
            history: Vec::new(),
        };
        account.record(HistoryEntry {
            amount: balance,
            kind: AdjustmentKind::Opening,
            note: "Opening balance".to_string(),
            transaction_id: None,
            recorded_at: Utc::now(),
        });
        account
    }

    /// Applies an entry to the balance and appends it to the history.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.balance += entry.amount;
        self.history.push(entry);
    }

    /// Sum of every history entry.
    #[must_use]
    pub fn history_total(&self) -> Decimal {
        self.history.iter().map(|entry| entry.amount).sum()
    }
}

/// A counter-party row in one of the party stores.
#[derive(Debug, Clone, PartialEq)]
pub struct PartyRecord {
    /// Party id.
    pub id: PartyId,
    /// Store the row lives in.
    pub store: PartyStore,
    /// Business code.
    pub code: String,
    /// Alternate customer id (secondary customer store).
    pub alias: Option<String>,
    /// Family id (pilgrims).
    pub family_id: Option<String>,
    /// Whether the row is live.
    pub is_active: bool,
    /// Total due.
    pub total_due: Decimal,
    /// Hajj due sub-total.
    pub hajj_due: Decimal,
    /// Umrah due sub-total.
    pub umrah_due: Decimal,
    /// Agent deposits.
    pub total_deposit: Decimal,
    /// Vendor payments.
    pub total_paid: Decimal,
    /// Customer or pilgrim payments.
    pub paid_amount: Decimal,
    /// Pilgrim package price.
    pub total_amount: Decimal,
}

impl PartyRecord {
    /// Creates an active party with zeroed aggregates.
    #[must_use]
    pub fn new(store: PartyStore, code: impl Into<String>) -> Self {
        Self {
            id: PartyId::new(),
            store,
            code: code.into(),
            alias: None,
            family_id: None,
            is_active: true,
            total_due: Decimal::ZERO,
            hajj_due: Decimal::ZERO,
            umrah_due: Decimal::ZERO,
            total_deposit: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
        }
    }

    /// Sets the customer alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the family id.
    #[must_use]
    pub fn with_family(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into());
        self
    }

    fn matches(&self, store: PartyStore, key: &PartyKey) -> bool {
        self.store == store
            && self.is_active
            && match key {
                PartyKey::Id(id) => self.id == *id,
                PartyKey::Code(code) => self.code == *code,
                PartyKey::Alias(alias) => self.alias.as_deref() == Some(alias.as_str()),
            }
    }

    fn handle(&self) -> PartyHandle {
        PartyHandle {
            store: self.store,
            id: self.id,
            family_id: self.family_id.clone(),
        }
    }

    fn apply(&mut self, delta: &PartyDelta) {
        self.total_due += delta.total_due;
        self.hajj_due += delta.hajj_due;
        self.umrah_due += delta.umrah_due;
        self.total_deposit += delta.total_deposit;
        self.total_paid += delta.total_paid;
        self.paid_amount += delta.paid_amount;
    }
}

/// An operating-expense category rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAggregate {
    /// Category id.
    pub id: ExpenseCategoryId,
    /// Display name.
    pub name: String,
    /// Sum of debit amounts.
    pub total_amount: Decimal,
    /// Number of debits.
    pub item_count: i32,
    /// Date of the last change.
    pub last_updated: Option<NaiveDate>,
}

impl CategoryAggregate {
    /// Creates a category with the given totals.
    #[must_use]
    pub fn new(name: impl Into<String>, total_amount: Decimal, item_count: i32) -> Self {
        Self {
            id: ExpenseCategoryId::new(),
            name: name.into(),
            total_amount,
            item_count,
            last_updated: None,
        }
    }
}

/// A money-exchange record that may be linked to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeLink {
    /// Record id.
    pub id: ExchangeId,
    /// Business reference.
    pub reference: String,
    /// Linked transaction.
    pub linked_transaction_id: Option<TransactionId>,
    /// Whether the record is linked.
    pub is_linked: bool,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl ExchangeLink {
    /// Creates a record linked to `transaction_id`.
    #[must_use]
    pub fn linked_to(reference: impl Into<String>, transaction_id: TransactionId) -> Self {
        Self {
            id: ExchangeId::new(),
            reference: reference.into(),
            linked_transaction_id: Some(transaction_id),
            is_linked: true,
            updated_at: Utc::now(),
        }
    }
}

/// Everything the in-memory store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    /// Transactions by id.
    pub transactions: BTreeMap<TransactionId, TransactionRecord>,
    /// Ledger accounts by id.
    pub accounts: BTreeMap<LedgerAccountId, LedgerAccount>,
    /// Parties across every store, in insertion order.
    pub parties: Vec<PartyRecord>,
    /// Expense categories by id.
    pub categories: BTreeMap<ExpenseCategoryId, CategoryAggregate>,
    /// Money-exchange records by id.
    pub exchanges: BTreeMap<ExchangeId, ExchangeLink>,
    /// Latest family totals per store and family.
    pub family_totals: BTreeMap<(PartyStore, String), FamilyTotals>,
    /// Every family totals write, in order.
    pub family_writes: Vec<FamilyTotals>,
    /// Every ledger account adjustment, in the order it was applied.
    pub account_writes: Vec<LedgerAccountId>,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Vec<FailPoint>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call at `point` fail. Clones share state but not faults.
    #[must_use]
    pub fn fail_at(mut self, point: FailPoint) -> Self {
        self.faults.push(point);
        self
    }

    /// Delays every session call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inserts a transaction.
    pub async fn insert_transaction(&self, record: TransactionRecord) {
        self.state.lock().await.transactions.insert(record.id, record);
    }

    /// Inserts a ledger account.
    pub async fn insert_account(&self, account: LedgerAccount) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    /// Inserts a party.
    pub async fn insert_party(&self, party: PartyRecord) {
        self.state.lock().await.parties.push(party);
    }

    /// Inserts an expense category.
    pub async fn insert_category(&self, category: CategoryAggregate) {
        self.state.lock().await.categories.insert(category.id, category);
    }

    /// Inserts a money-exchange record.
    pub async fn insert_exchange(&self, exchange: ExchangeLink) {
        self.state.lock().await.exchanges.insert(exchange.id, exchange);
    }

    /// Returns a copy of the whole state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Returns a transaction.
    pub async fn transaction(&self, id: TransactionId) -> Option<TransactionRecord> {
        self.state.lock().await.transactions.get(&id).cloned()
    }

    /// Returns a ledger account.
    pub async fn account(&self, id: LedgerAccountId) -> Option<LedgerAccount> {
        self.state.lock().await.accounts.get(&id).cloned()
    }

    /// Returns a party.
    pub async fn party(&self, id: PartyId) -> Option<PartyRecord> {
        self.state
            .lock()
            .await
            .parties
            .iter()
            .find(|party| party.id == id)
            .cloned()
    }

    /// Returns an expense category.
    pub async fn category(&self, id: ExpenseCategoryId) -> Option<CategoryAggregate> {
        self.state.lock().await.categories.get(&id).cloned()
    }

    /// Returns a money-exchange record.
    pub async fn exchange(&self, id: ExchangeId) -> Option<ExchangeLink> {
        self.state.lock().await.exchanges.get(&id).cloned()
    }

    /// Returns every family totals write, in order.
    pub async fn family_writes(&self) -> Vec<FamilyTotals> {
        self.state.lock().await.family_writes.clone()
    }

    /// Returns the ledger accounts adjusted so far, in application order.
    pub async fn account_writes(&self) -> Vec<LedgerAccountId> {
        self.state.lock().await.account_writes.clone()
    }

    fn fails_at(&self, point: FailPoint) -> bool {
        self.faults.contains(&point)
    }
}

#[async_trait]
impl ReversalStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn ReversalSession>> {
        if self.fails_at(FailPoint::Begin) {
            return Err(injected(FailPoint::Begin));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemorySession {
            guard: Some(guard),
            snapshot: Some(snapshot),
            faults: self.faults.clone(),
            latency: self.latency,
        }))
    }

    async fn unlink_exchange(
        &self,
        exchange_ref: &str,
        transaction_id: TransactionId,
    ) -> StoreResult<bool> {
        if self.fails_at(FailPoint::UnlinkExchange) {
            return Err(injected(FailPoint::UnlinkExchange));
        }

        let id = Uuid::parse_str(exchange_ref).ok().map(ExchangeId::from_uuid);
        let mut state = self.state.lock().await;
        let Some(exchange) = state
            .exchanges
            .values_mut()
            .find(|exchange| {
                (Some(exchange.id) == id || exchange.reference == exchange_ref)
                    && exchange
                        .linked_transaction_id
                        .is_none_or(|linked| linked == transaction_id)
            })
        else {
            return Ok(false);
        };

        exchange.linked_transaction_id = None;
        exchange.is_linked = false;
        exchange.updated_at = Utc::now();
        Ok(true)
    }
}

/// Unit of work over the in-memory state.
#[derive(Debug)]
pub struct MemorySession {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    snapshot: Option<MemoryState>,
    faults: Vec<FailPoint>,
    latency: Option<Duration>,
}

impl MemorySession {
    async fn enter(&mut self, point: FailPoint) -> StoreResult<&mut MemoryState> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.faults.contains(&point) {
            return Err(injected(point));
        }
        self.guard.as_deref_mut().ok_or(StoreError::Closed)
    }

    fn restore(&mut self) {
        if let (Some(mut guard), Some(snapshot)) = (self.guard.take(), self.snapshot.take()) {
            *guard = snapshot;
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.restore();
    }
}

#[async_trait]
impl ReversalSession for MemorySession {
    async fn find_transaction(
        &mut self,
        lookup: &TransactionLookup,
    ) -> StoreResult<Option<TransactionRecord>> {
        let state = self.enter(FailPoint::FindTransaction).await?;
        Ok(state
            .transactions
            .values()
            .find(|record| record.matches(lookup))
            .cloned())
    }

    async fn adjust_account(
        &mut self,
        account_id: LedgerAccountId,
        entry: &HistoryEntry,
    ) -> StoreResult<bool> {
        let state = self.enter(FailPoint::AdjustAccount).await?;
        let Some(account) = state.accounts.get_mut(&account_id) else {
            return Ok(false);
        };
        account.record(entry.clone());
        state.account_writes.push(account_id);
        Ok(true)
    }

    async fn find_party(
        &mut self,
        store: PartyStore,
        key: &PartyKey,
    ) -> StoreResult<Option<PartyHandle>> {
        let state = self.enter(FailPoint::FindParty).await?;
        Ok(state
            .parties
            .iter()
            .find(|party| party.matches(store, key))
            .map(PartyRecord::handle))
    }

    async fn apply_party_delta(
        &mut self,
        party: &PartyHandle,
        delta: &PartyDelta,
    ) -> StoreResult<()> {
        let state = self.enter(FailPoint::ApplyPartyDelta).await?;
        let record = state
            .parties
            .iter_mut()
            .find(|record| record.store == party.store && record.id == party.id)
            .ok_or_else(|| {
                StoreError::Inconsistent(format!("{} {} disappeared", party.store, party.id))
            })?;
        record.apply(delta);
        Ok(())
    }

    async fn family_members(
        &mut self,
        store: PartyStore,
        family_id: &str,
    ) -> StoreResult<Vec<FamilyMember>> {
        let state = self.enter(FailPoint::FamilyMembers).await?;
        Ok(state
            .parties
            .iter()
            .filter(|party| {
                party.store == store
                    && party.is_active
                    && party.family_id.as_deref() == Some(family_id)
            })
            .map(|party| FamilyMember {
                id: party.id,
                total_amount: party.total_amount,
                paid_amount: party.paid_amount,
                total_due: party.total_due,
            })
            .collect())
    }

    async fn store_family_totals(&mut self, totals: &FamilyTotals) -> StoreResult<()> {
        let state = self.enter(FailPoint::StoreFamilyTotals).await?;
        state
            .family_totals
            .insert((totals.store, totals.family_id.clone()), totals.clone());
        state.family_writes.push(totals.clone());
        Ok(())
    }

    async fn adjust_category(
        &mut self,
        adjustment: &CategoryAdjustment,
        updated_on: NaiveDate,
    ) -> StoreResult<bool> {
        let state = self.enter(FailPoint::AdjustCategory).await?;
        let Some(category) = state.categories.get_mut(&adjustment.category_id) else {
            return Ok(false);
        };
        category.total_amount += adjustment.amount_delta;
        category.item_count += adjustment.count_delta;
        category.last_updated = Some(updated_on);
        Ok(true)
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> StoreResult<u64> {
        let no_rows = self.faults.contains(&FailPoint::DeleteNoRows);
        let state = self.enter(FailPoint::DeleteTransaction).await?;
        if no_rows {
            return Ok(0);
        }
        Ok(u64::from(state.transactions.remove(&id).is_some()))
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.enter(FailPoint::Commit).await?;
        self.snapshot = None;
        self.guard = None;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.restore();
        Ok(())
    }
}

fn injected(point: FailPoint) -> StoreError {
    StoreError::Backend(format!("injected failure at {point:?}"))
}
