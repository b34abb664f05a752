//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use safar_core::reversal::{AdjustmentKind, PartyStore, TransactionKind};

/// `transaction_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
pub enum TransactionKindDb {
    /// Money received.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Money paid out.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Money moved between accounts.
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl From<TransactionKindDb> for TransactionKind {
    fn from(kind: TransactionKindDb) -> Self {
        match kind {
            TransactionKindDb::Credit => Self::Credit,
            TransactionKindDb::Debit => Self::Debit,
            TransactionKindDb::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionKind> for TransactionKindDb {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Credit => Self::Credit,
            TransactionKind::Debit => Self::Debit,
            TransactionKind::Transfer => Self::Transfer,
        }
    }
}

/// `party_store` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "party_store")]
pub enum PartyStoreDb {
    /// Agents.
    #[sea_orm(string_value = "agent")]
    Agent,
    /// Vendors.
    #[sea_orm(string_value = "vendor")]
    Vendor,
    /// Primary customers.
    #[sea_orm(string_value = "customer")]
    Customer,
    /// Airline ticketing customers.
    #[sea_orm(string_value = "air_customer")]
    AirCustomer,
    /// Hajj pilgrims.
    #[sea_orm(string_value = "haji")]
    Haji,
    /// Umrah pilgrims.
    #[sea_orm(string_value = "umrah")]
    Umrah,
}

impl From<PartyStoreDb> for PartyStore {
    fn from(store: PartyStoreDb) -> Self {
        match store {
            PartyStoreDb::Agent => Self::Agent,
            PartyStoreDb::Vendor => Self::Vendor,
            PartyStoreDb::Customer => Self::Customer,
            PartyStoreDb::AirCustomer => Self::AirCustomer,
            PartyStoreDb::Haji => Self::Haji,
            PartyStoreDb::Umrah => Self::Umrah,
        }
    }
}

impl From<PartyStore> for PartyStoreDb {
    fn from(store: PartyStore) -> Self {
        match store {
            PartyStore::Agent => Self::Agent,
            PartyStore::Vendor => Self::Vendor,
            PartyStore::Customer => Self::Customer,
            PartyStore::AirCustomer => Self::AirCustomer,
            PartyStore::Haji => Self::Haji,
            PartyStore::Umrah => Self::Umrah,
        }
    }
}

/// `balance_adjustment_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "balance_adjustment_kind")]
pub enum AdjustmentKindDb {
    /// Opening balance.
    #[sea_orm(string_value = "opening")]
    Opening,
    /// Money received.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Money paid out.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Outgoing transfer leg.
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    /// Incoming transfer leg.
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    /// Undo of a deleted transaction.
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

impl From<AdjustmentKind> for AdjustmentKindDb {
    fn from(kind: AdjustmentKind) -> Self {
        match kind {
            AdjustmentKind::Opening => Self::Opening,
            AdjustmentKind::Credit => Self::Credit,
            AdjustmentKind::Debit => Self::Debit,
            AdjustmentKind::TransferOut => Self::TransferOut,
            AdjustmentKind::TransferIn => Self::TransferIn,
            AdjustmentKind::Reversal => Self::Reversal,
        }
    }
}
