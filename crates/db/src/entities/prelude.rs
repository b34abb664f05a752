//! Entity re-exports.

pub use super::expense_categories::Entity as ExpenseCategories;
pub use super::family_summaries::Entity as FamilySummaries;
pub use super::ledger_account_history::Entity as LedgerAccountHistory;
pub use super::ledger_accounts::Entity as LedgerAccounts;
pub use super::money_exchanges::Entity as MoneyExchanges;
pub use super::parties::Entity as Parties;
pub use super::transactions::Entity as Transactions;
