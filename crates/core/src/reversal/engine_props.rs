//! Property-based tests for the reversal engine.
//!
//! Balance conservation: for every transaction kind and party variant,
//! reversing a transaction restores exactly the aggregates its creation
//! moved. Creation is modelled by a local forward table.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::ReversalEngine;
use super::memory::{CategoryAggregate, LedgerAccount, MemoryStore, PartyRecord};
use super::party::PartyStore;
use super::plan::CategoryTags;
use super::types::{TransactionKind, TransactionRecord};

/// Strategy to generate non-negative amounts (0.00 to 10,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate starting balances, possibly negative.
fn balance() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Credit),
        Just(TransactionKind::Debit),
        Just(TransactionKind::Transfer),
    ]
}

fn party_strategy() -> impl Strategy<Value = Option<PartyStore>> {
    prop_oneof![
        Just(None),
        Just(Some(PartyStore::Agent)),
        Just(Some(PartyStore::Vendor)),
        Just(Some(PartyStore::Customer)),
        Just(Some(PartyStore::AirCustomer)),
        Just(Some(PartyStore::Haji)),
        Just(Some(PartyStore::Umrah)),
    ]
}

fn label_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("hajj"),
        Just("umrah package"),
        Just("hajj + umrah"),
        Just("air ticket"),
    ]
}

fn party_type(store: PartyStore) -> &'static str {
    match store {
        PartyStore::Agent => "agent",
        PartyStore::Vendor => "vendor",
        PartyStore::Customer | PartyStore::AirCustomer => "customer",
        PartyStore::Haji => "haji",
        PartyStore::Umrah => "umrah",
    }
}

fn signed(kind: TransactionKind, credit: Decimal, debit: Decimal) -> Decimal {
    match kind {
        TransactionKind::Credit => credit,
        TransactionKind::Debit => debit,
        TransactionKind::Transfer => Decimal::ZERO,
    }
}

/// What creating the transaction did to the party.
fn forward_party(party: &mut PartyRecord, kind: TransactionKind, amount: Decimal, tags: CategoryTags) {
    let due = match party.store {
        PartyStore::Agent | PartyStore::Customer | PartyStore::AirCustomer => {
            signed(kind, -amount, amount)
        }
        PartyStore::Vendor => signed(kind, amount, -amount),
        PartyStore::Haji | PartyStore::Umrah => Decimal::ZERO,
    };
    party.total_due += due;
    if tags.hajj {
        party.hajj_due += due;
    }
    if tags.umrah {
        party.umrah_due += due;
    }

    match party.store {
        PartyStore::Agent => party.total_deposit += signed(kind, amount, Decimal::ZERO),
        PartyStore::Vendor => party.total_paid += signed(kind, Decimal::ZERO, amount),
        PartyStore::Customer
        | PartyStore::AirCustomer
        | PartyStore::Haji
        | PartyStore::Umrah => party.paid_amount += signed(kind, amount, Decimal::ZERO),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Feature: transaction-reversal, Property: Balance Conservation
    /// reverse(apply(state, tx)) == state for every account and party field.
    #[test]
    fn test_reverse_undoes_forward(
        kind in kind_strategy(),
        amount in amount(),
        store_kind in party_strategy(),
        label in label_strategy(),
        source_balance in balance(),
        target_balance in balance(),
        due in balance(),
        paid in balance(),
        category_total in amount(),
    ) {
        let rt = runtime();
        let store = MemoryStore::new();
        let tags = CategoryTags::from_label(label);

        let mut source = LedgerAccount::with_opening_balance("Source", source_balance);
        let mut target = LedgerAccount::with_opening_balance("Target", target_balance);
        let mut category = CategoryAggregate::new("Expenses", category_total, 4);

        let mut party = store_kind.map(|s| {
            let mut party = PartyRecord::new(s, "P-1").with_family("FAM-1");
            party.total_due = due;
            party.hajj_due = due;
            party.umrah_due = due;
            party.total_deposit = paid;
            party.total_paid = paid;
            party.paid_amount = paid;
            party.total_amount = due + paid;
            party
        });

        let original_accounts = (source.balance, target.balance);
        let original_party = party.clone();
        let original_category = (category.total_amount, category.item_count);

        // Forward path.
        match kind {
            TransactionKind::Credit => target.balance += amount,
            TransactionKind::Debit => target.balance -= amount,
            TransactionKind::Transfer => {
                source.balance -= amount;
                target.balance += amount;
            }
        }
        if kind == TransactionKind::Debit {
            category.total_amount += amount;
            category.item_count += 1;
        }
        if let Some(party) = party.as_mut() {
            forward_party(party, kind, amount, tags);
        }

        let mut tx = TransactionRecord::new(kind, amount)
            .with_target_account(target.id)
            .with_service_category(label)
            .with_expense_category(category.id);
        if kind == TransactionKind::Transfer {
            tx = tx.with_source_account(source.id);
        }
        if let Some(party) = &party {
            tx = tx.with_party(party_type(party.store), party.id.to_string());
        }

        let (source_id, target_id, category_id) = (source.id, target.id, category.id);
        let reversed_party = rt.block_on(async {
            store.insert_account(source).await;
            store.insert_account(target).await;
            store.insert_category(category).await;
            if let Some(party) = party.clone() {
                store.insert_party(party).await;
            }
            store.insert_transaction(tx.clone()).await;

            ReversalEngine::new(Arc::new(store.clone()))
                .reverse_and_delete(&tx.id.to_string())
                .await
                .unwrap();

            match &party {
                Some(p) => store.party(p.id).await,
                None => None,
            }
        });

        let state = rt.block_on(store.snapshot());
        prop_assert_eq!(
            (state.accounts[&source_id].balance, state.accounts[&target_id].balance),
            original_accounts
        );
        let category = &state.categories[&category_id];
        prop_assert_eq!((category.total_amount, category.item_count), original_category);
        prop_assert_eq!(reversed_party, original_party);
        prop_assert!(state.transactions.is_empty());
    }

    /// Feature: transaction-reversal, Property: Balance History Integrity
    /// After a reversal every account balance equals the sum of its history.
    #[test]
    fn test_history_sums_to_balance(
        kind in kind_strategy(),
        amount in amount(),
        opening in balance(),
    ) {
        let rt = runtime();
        let store = MemoryStore::new();
        let source = LedgerAccount::with_opening_balance("Source", opening);
        let target = LedgerAccount::with_opening_balance("Target", opening);
        let (source_id, target_id) = (source.id, target.id);
        let tx = TransactionRecord::new(kind, amount)
            .with_source_account(source_id)
            .with_target_account(target_id);

        let state = rt.block_on(async {
            store.insert_account(source).await;
            store.insert_account(target).await;
            store.insert_transaction(tx.clone()).await;
            ReversalEngine::new(Arc::new(store.clone()))
                .reverse_and_delete(&tx.transaction_code)
                .await
                .unwrap();
            store.snapshot().await
        });

        for id in [source_id, target_id] {
            let account = &state.accounts[&id];
            prop_assert_eq!(account.history_total(), account.balance);
        }
    }
}
