//! `SeaORM` Entity for parties table.
//!
//! Every counter-party store shares this table, discriminated by `store`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PartyStoreDb;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "parties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store: PartyStoreDb,
    pub code: String,
    pub alias: Option<String>,
    pub family_id: Option<String>,
    pub is_active: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_due: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub hajj_due: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub umrah_due: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_deposit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_paid: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub paid_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
