//! `SeaORM` entity definitions.

pub mod prelude;

pub mod expense_categories;
pub mod family_summaries;
pub mod ledger_account_history;
pub mod ledger_accounts;
pub mod money_exchanges;
pub mod parties;
pub mod sea_orm_active_enums;
pub mod transactions;
