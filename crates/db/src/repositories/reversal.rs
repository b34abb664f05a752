//! Postgres-backed reversal store.
//!
//! One reversal session is one database transaction. The transaction row is
//! locked with `SELECT ... FOR UPDATE`, and every aggregate is changed with an
//! in-place `col = col + delta` update, so concurrent reversals touching the
//! same account or party serialize on row locks instead of overwriting each
//! other. Family recomputation runs inside a savepoint: a failure there can be
//! discarded without poisoning the outer transaction.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use safar_core::reversal::{
    CategoryAdjustment, FamilyMember, FamilyTotals, HistoryEntry, PartyDelta, PartyHandle,
    PartyKey, PartyStore, ReversalSession, ReversalStore, StoreError, StoreResult,
    TransactionLookup, TransactionRecord,
};
use safar_shared::types::{ExpenseCategoryId, LedgerAccountId, PartyId, TransactionId};

use crate::entities::sea_orm_active_enums::PartyStoreDb;
use crate::entities::{
    expense_categories, family_summaries, ledger_account_history, ledger_accounts,
    money_exchanges, parties, transactions,
};

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Reversal store over a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmReversalStore {
    db: DatabaseConnection,
}

impl SeaOrmReversalStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReversalStore for SeaOrmReversalStore {
    async fn begin(&self) -> StoreResult<Box<dyn ReversalSession>> {
        let txn = self.db.begin().await.map_err(backend)?;
        Ok(Box::new(SeaOrmReversalSession { txn: Some(txn) }))
    }

    async fn unlink_exchange(
        &self,
        exchange_ref: &str,
        transaction_id: TransactionId,
    ) -> StoreResult<bool> {
        let mut reference = Condition::any().add(money_exchanges::Column::Reference.eq(exchange_ref));
        if let Ok(id) = Uuid::parse_str(exchange_ref) {
            reference = reference.add(money_exchanges::Column::Id.eq(id));
        }
        // A record relinked to another transaction since is left alone.
        let target = Condition::all().add(reference).add(
            Condition::any()
                .add(money_exchanges::Column::LinkedTransactionId.eq(transaction_id.into_inner()))
                .add(money_exchanges::Column::LinkedTransactionId.is_null()),
        );

        let result = money_exchanges::Entity::update_many()
            .col_expr(
                money_exchanges::Column::LinkedTransactionId,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(money_exchanges::Column::IsLinked, Expr::value(false))
            .col_expr(money_exchanges::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(target)
            .exec(&self.db)
            .await
            .map_err(backend)?;

        debug!(
            exchange = exchange_ref,
            %transaction_id,
            rows = result.rows_affected,
            "Money-exchange link cleared"
        );
        Ok(result.rows_affected > 0)
    }
}

/// One database transaction.
#[derive(Debug)]
pub struct SeaOrmReversalSession {
    txn: Option<DatabaseTransaction>,
}

impl SeaOrmReversalSession {
    fn txn(&self) -> StoreResult<&DatabaseTransaction> {
        self.txn.as_ref().ok_or(StoreError::Closed)
    }
}

fn to_record(model: transactions::Model) -> TransactionRecord {
    TransactionRecord {
        id: TransactionId::from_uuid(model.id),
        transaction_code: model.transaction_code,
        kind: model.kind.into(),
        amount: model.amount,
        party_id: model.party_id,
        party_type: model.party_type,
        from_account_id: model.from_account_id.map(LedgerAccountId::from_uuid),
        target_account_id: model.target_account_id.map(LedgerAccountId::from_uuid),
        service_category: model.service_category,
        expense_category_id: model.expense_category_id.map(ExpenseCategoryId::from_uuid),
        scope: model.scope,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl ReversalSession for SeaOrmReversalSession {
    async fn find_transaction(
        &mut self,
        lookup: &TransactionLookup,
    ) -> StoreResult<Option<TransactionRecord>> {
        let filter = match lookup {
            TransactionLookup::Id(id) => transactions::Column::Id.eq(id.into_inner()),
            TransactionLookup::Code(code) => transactions::Column::TransactionCode.eq(code.as_str()),
        };

        let model = transactions::Entity::find()
            .filter(filter)
            .lock_exclusive()
            .one(self.txn()?)
            .await
            .map_err(backend)?;

        Ok(model.map(to_record))
    }

    async fn adjust_account(
        &mut self,
        account_id: LedgerAccountId,
        entry: &HistoryEntry,
    ) -> StoreResult<bool> {
        let txn = self.txn()?;

        let result = ledger_accounts::Entity::update_many()
            .col_expr(
                ledger_accounts::Column::Balance,
                Expr::col(ledger_accounts::Column::Balance).add(entry.amount),
            )
            .col_expr(ledger_accounts::Column::UpdatedAt, Expr::value(entry.recorded_at))
            .filter(ledger_accounts::Column::Id.eq(account_id.into_inner()))
            .exec(txn)
            .await
            .map_err(backend)?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        let history = ledger_account_history::ActiveModel {
            id: Set(Uuid::now_v7()),
            account_id: Set(account_id.into_inner()),
            amount: Set(entry.amount),
            kind: Set(entry.kind.into()),
            note: Set(entry.note.clone()),
            transaction_id: Set(entry.transaction_id.map(TransactionId::into_inner)),
            recorded_at: Set(entry.recorded_at.into()),
        };
        ledger_account_history::Entity::insert(history)
            .exec_without_returning(txn)
            .await
            .map_err(backend)?;

        Ok(true)
    }

    async fn find_party(
        &mut self,
        store: PartyStore,
        key: &PartyKey,
    ) -> StoreResult<Option<PartyHandle>> {
        let key_filter = match key {
            PartyKey::Id(id) => parties::Column::Id.eq(id.into_inner()),
            PartyKey::Code(code) => parties::Column::Code.eq(code.as_str()),
            PartyKey::Alias(alias) => parties::Column::Alias.eq(alias.as_str()),
        };

        let model = parties::Entity::find()
            .filter(parties::Column::Store.eq(PartyStoreDb::from(store)))
            .filter(key_filter)
            .filter(parties::Column::IsActive.eq(true))
            .lock_exclusive()
            .one(self.txn()?)
            .await
            .map_err(backend)?;

        Ok(model.map(|party| PartyHandle {
            store: party.store.into(),
            id: PartyId::from_uuid(party.id),
            family_id: party.family_id,
        }))
    }

    async fn apply_party_delta(
        &mut self,
        party: &PartyHandle,
        delta: &PartyDelta,
    ) -> StoreResult<()> {
        let mut update = parties::Entity::update_many()
            .col_expr(parties::Column::UpdatedAt, Expr::value(Utc::now()));

        for (column, change) in [
            (parties::Column::TotalDue, delta.total_due),
            (parties::Column::HajjDue, delta.hajj_due),
            (parties::Column::UmrahDue, delta.umrah_due),
            (parties::Column::TotalDeposit, delta.total_deposit),
            (parties::Column::TotalPaid, delta.total_paid),
            (parties::Column::PaidAmount, delta.paid_amount),
        ] {
            if !change.is_zero() {
                update = update.col_expr(column, Expr::col(column).add(change));
            }
        }

        let result = update
            .filter(parties::Column::Id.eq(party.id.into_inner()))
            .exec(self.txn()?)
            .await
            .map_err(backend)?;

        if result.rows_affected == 0 {
            return Err(StoreError::Inconsistent(format!(
                "{} {} disappeared",
                party.store, party.id
            )));
        }
        Ok(())
    }

    async fn family_members(
        &mut self,
        store: PartyStore,
        family_id: &str,
    ) -> StoreResult<Vec<FamilyMember>> {
        let savepoint = self.txn()?.begin().await.map_err(backend)?;

        let members = parties::Entity::find()
            .filter(parties::Column::Store.eq(PartyStoreDb::from(store)))
            .filter(parties::Column::FamilyId.eq(family_id))
            .filter(parties::Column::IsActive.eq(true))
            .all(&savepoint)
            .await
            .map_err(backend)?;

        savepoint.commit().await.map_err(backend)?;

        Ok(members
            .into_iter()
            .map(|member| FamilyMember {
                id: PartyId::from_uuid(member.id),
                total_amount: member.total_amount,
                paid_amount: member.paid_amount,
                total_due: member.total_due,
            })
            .collect())
    }

    async fn store_family_totals(&mut self, totals: &FamilyTotals) -> StoreResult<()> {
        let member_count = i32::try_from(totals.member_count).map_err(|_| {
            StoreError::Inconsistent(format!("family {} is too large", totals.family_id))
        })?;
        let summary = family_summaries::ActiveModel {
            store: Set(totals.store.into()),
            family_id: Set(totals.family_id.clone()),
            member_count: Set(member_count),
            total_amount: Set(totals.total_amount),
            paid_amount: Set(totals.paid_amount),
            total_due: Set(totals.total_due),
            computed_at: Set(totals.computed_at.into()),
        };

        let savepoint = self.txn()?.begin().await.map_err(backend)?;

        family_summaries::Entity::insert(summary)
            .on_conflict(
                OnConflict::columns([
                    family_summaries::Column::Store,
                    family_summaries::Column::FamilyId,
                ])
                .update_columns([
                    family_summaries::Column::MemberCount,
                    family_summaries::Column::TotalAmount,
                    family_summaries::Column::PaidAmount,
                    family_summaries::Column::TotalDue,
                    family_summaries::Column::ComputedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&savepoint)
            .await
            .map_err(backend)?;

        savepoint.commit().await.map_err(backend)
    }

    async fn adjust_category(
        &mut self,
        adjustment: &CategoryAdjustment,
        updated_on: NaiveDate,
    ) -> StoreResult<bool> {
        let result = expense_categories::Entity::update_many()
            .col_expr(
                expense_categories::Column::TotalAmount,
                Expr::col(expense_categories::Column::TotalAmount).add(adjustment.amount_delta),
            )
            .col_expr(
                expense_categories::Column::ItemCount,
                Expr::col(expense_categories::Column::ItemCount).add(adjustment.count_delta),
            )
            .col_expr(expense_categories::Column::LastUpdated, Expr::value(updated_on))
            .filter(expense_categories::Column::Id.eq(adjustment.category_id.into_inner()))
            .exec(self.txn()?)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> StoreResult<u64> {
        let result = transactions::Entity::delete_by_id(id.into_inner())
            .exec(self.txn()?)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let txn = self.txn.take().ok_or(StoreError::Closed)?;
        txn.commit().await.map_err(backend)
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        match self.txn.take() {
            Some(txn) => txn.rollback().await.map_err(backend),
            None => Ok(()),
        }
    }
}

/// Sums the balance history of an account.
///
/// After any committed reversal this equals the account's `balance` column.
pub async fn history_total(
    db: &DatabaseConnection,
    account_id: LedgerAccountId,
) -> Result<Decimal, DbErr> {
    let entries = ledger_account_history::Entity::find()
        .filter(ledger_account_history::Column::AccountId.eq(account_id.into_inner()))
        .all(db)
        .await?;
    Ok(entries.iter().map(|entry| entry.amount).sum())
}
