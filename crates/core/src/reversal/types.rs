//! Reversal domain types.
//!
//! This module defines the transaction record as the reversal engine sees it,
//! the identifiers callers use to address it, and the balance-history entries
//! the engine appends to ledger accounts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use safar_shared::types::{ExpenseCategoryId, LedgerAccountId, TransactionId};

use crate::reversal::error::ReversalError;
use crate::reversal::party::PartyVariant;

/// Scope value marking transactions owned by the personal-expense module.
pub const PERSONAL_EXPENSE_SCOPE: &str = "personal-expense";

/// Longest business code accepted as a transaction identifier.
pub const MAX_TRANSACTION_CODE_LEN: usize = 64;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received into the target account.
    Credit,
    /// Money paid out of the target account.
    Debit,
    /// Money moved from the source account to the target account.
    Transfer,
}

impl TransactionKind {
    /// Returns the lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Counter-party type carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyType {
    /// A party whose aggregates the reversal adjusts.
    Participant(PartyVariant),
    /// A money-exchange record linked to the transaction.
    MoneyExchange,
    /// Anything the engine does not recognise.
    Other(String),
}

impl PartyType {
    /// Parses a stored party type, ignoring case, spaces, dashes and underscores.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let variant = match normalized.as_str() {
            "agent" => PartyVariant::Agent,
            "vendor" => PartyVariant::Vendor,
            "customer" => PartyVariant::Customer,
            "haji" | "hajji" => PartyVariant::Haji,
            "umrah" => PartyVariant::Umrah,
            "loan" => PartyVariant::Loan,
            "investment" => PartyVariant::Investment,
            "asset" => PartyVariant::Asset,
            "employee" => PartyVariant::Employee,
            "moneyexchange" | "exchange" => return Self::MoneyExchange,
            _ => return Self::Other(raw.to_string()),
        };
        Self::Participant(variant)
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant(variant) => write!(f, "{variant}"),
            Self::MoneyExchange => f.write_str("money-exchange"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for PartyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a caller addresses a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLookup {
    /// Internal identifier.
    Id(TransactionId),
    /// Human-readable transaction code.
    Code(String),
}

impl TransactionLookup {
    /// Parses a raw identifier without touching storage.
    ///
    /// UUIDs resolve by id, ASCII codes made of letters, digits, `-` and `_`
    /// resolve by transaction code. Everything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, ReversalError> {
        if let Ok(uuid) = Uuid::parse_str(raw) {
            return Ok(Self::Id(TransactionId::from_uuid(uuid)));
        }

        let is_code = !raw.is_empty()
            && raw.len() <= MAX_TRANSACTION_CODE_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));

        if is_code {
            Ok(Self::Code(raw.to_string()))
        } else {
            Err(ReversalError::InvalidId(raw.to_string()))
        }
    }
}

impl fmt::Display for TransactionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => f.write_str(code),
        }
    }
}

/// A stored financial transaction as read by the reversal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Internal identifier.
    pub id: TransactionId,
    /// Human-readable transaction code.
    pub transaction_code: String,
    /// Direction of the transaction.
    pub kind: TransactionKind,
    /// Amount as stored. Missing values reverse as zero.
    pub amount: Option<Decimal>,
    /// Counter-party id or business code.
    pub party_id: Option<String>,
    /// Counter-party type label.
    pub party_type: Option<String>,
    /// Source account of a transfer.
    pub from_account_id: Option<LedgerAccountId>,
    /// Destination account of a credit, debit or transfer.
    pub target_account_id: Option<LedgerAccountId>,
    /// Free-text service category (e.g. "Hajj package").
    pub service_category: Option<String>,
    /// Operating-expense category reference.
    pub expense_category_id: Option<ExpenseCategoryId>,
    /// Owning module scope.
    pub scope: Option<String>,
    /// Whether the record is live.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates an active transaction with a generated id and code.
    #[must_use]
    pub fn new(kind: TransactionKind, amount: Decimal) -> Self {
        let id = TransactionId::new();
        let now = Utc::now();
        let simple = id.into_inner().simple().to_string();
        Self {
            id,
            transaction_code: format!("TRX-{}", simple[simple.len() - 8..].to_uppercase()),
            kind,
            amount: Some(amount),
            party_id: None,
            party_type: None,
            from_account_id: None,
            target_account_id: None,
            service_category: None,
            expense_category_id: None,
            scope: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the transaction code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.transaction_code = code.into();
        self
    }

    /// Sets the destination account.
    #[must_use]
    pub fn with_target_account(mut self, account_id: LedgerAccountId) -> Self {
        self.target_account_id = Some(account_id);
        self
    }

    /// Sets the source account.
    #[must_use]
    pub fn with_source_account(mut self, account_id: LedgerAccountId) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    /// Sets the counter-party reference.
    #[must_use]
    pub fn with_party(mut self, party_type: impl Into<String>, party_id: impl Into<String>) -> Self {
        self.party_type = Some(party_type.into());
        self.party_id = Some(party_id.into());
        self
    }

    /// Sets the service category label.
    #[must_use]
    pub fn with_service_category(mut self, category: impl Into<String>) -> Self {
        self.service_category = Some(category.into());
        self
    }

    /// Sets the operating-expense category.
    #[must_use]
    pub fn with_expense_category(mut self, category_id: ExpenseCategoryId) -> Self {
        self.expense_category_id = Some(category_id);
        self
    }

    /// Sets the owning scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Returns true if the record matches the lookup key.
    #[must_use]
    pub fn matches(&self, lookup: &TransactionLookup) -> bool {
        match lookup {
            TransactionLookup::Id(id) => self.id == *id,
            TransactionLookup::Code(code) => self.transaction_code == *code,
        }
    }

    /// Returns true if the reversal engine may act on this record.
    ///
    /// Inactive records and personal-expense records are invisible to it.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.is_active
            && !self
                .scope
                .as_deref()
                .is_some_and(|scope| scope.eq_ignore_ascii_case(PERSONAL_EXPENSE_SCOPE))
    }
}

/// Kind of a balance-history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Opening balance.
    Opening,
    /// Money received.
    Credit,
    /// Money paid out.
    Debit,
    /// Outgoing leg of a transfer.
    TransferOut,
    /// Incoming leg of a transfer.
    TransferIn,
    /// Undo of a deleted transaction.
    Reversal,
}

impl AdjustmentKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::Reversal => "reversal",
        }
    }
}

/// One append-only entry in a ledger account's balance history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Signed change applied to the balance.
    pub amount: Decimal,
    /// Kind of adjustment.
    pub kind: AdjustmentKind,
    /// Free-text note.
    pub note: String,
    /// Transaction that caused the adjustment.
    pub transaction_id: Option<TransactionId>,
    /// When the adjustment was recorded.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("agent", PartyType::Participant(PartyVariant::Agent))]
    #[case("Vendor", PartyType::Participant(PartyVariant::Vendor))]
    #[case("customer", PartyType::Participant(PartyVariant::Customer))]
    #[case("haji", PartyType::Participant(PartyVariant::Haji))]
    #[case("Hajji", PartyType::Participant(PartyVariant::Haji))]
    #[case("umrah", PartyType::Participant(PartyVariant::Umrah))]
    #[case("loan", PartyType::Participant(PartyVariant::Loan))]
    #[case("employee", PartyType::Participant(PartyVariant::Employee))]
    #[case("money-exchange", PartyType::MoneyExchange)]
    #[case("money_exchange", PartyType::MoneyExchange)]
    #[case("moneyExchange", PartyType::MoneyExchange)]
    #[case("airline", PartyType::Other("airline".to_string()))]
    fn test_party_type_parse(#[case] raw: &str, #[case] expected: PartyType) {
        assert_eq!(PartyType::parse(raw), expected);
    }

    #[test]
    fn test_lookup_parses_uuid_as_id() {
        let uuid = Uuid::new_v4();
        let lookup = TransactionLookup::parse(&uuid.to_string()).unwrap();
        assert_eq!(lookup, TransactionLookup::Id(TransactionId::from_uuid(uuid)));
    }

    #[test]
    fn test_lookup_parses_code() {
        let lookup = TransactionLookup::parse("TRX-2026_0001").unwrap();
        assert_eq!(lookup, TransactionLookup::Code("TRX-2026_0001".to_string()));
    }

    #[rstest]
    #[case("")]
    #[case("TRX 0001")]
    #[case("TRX-0001;DROP")]
    #[case("{\"$ne\":null}")]
    fn test_lookup_rejects_malformed(#[case] raw: &str) {
        let err = TransactionLookup::parse(raw).unwrap_err();
        assert!(matches!(err, ReversalError::InvalidId(_)));
    }

    #[test]
    fn test_lookup_rejects_overlong_code() {
        let raw = "A".repeat(MAX_TRANSACTION_CODE_LEN + 1);
        assert!(TransactionLookup::parse(&raw).is_err());
    }

    #[test]
    fn test_transaction_kind_from_str() {
        assert_eq!("Credit".parse::<TransactionKind>(), Ok(TransactionKind::Credit));
        assert_eq!(" debit ".parse::<TransactionKind>(), Ok(TransactionKind::Debit));
        assert_eq!(
            "transfer".parse::<TransactionKind>(),
            Ok(TransactionKind::Transfer)
        );
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_personal_expense_is_not_reversible() {
        let tx = TransactionRecord::new(TransactionKind::Debit, dec!(10))
            .with_scope("Personal-Expense");
        assert!(!tx.is_reversible());
    }

    #[test]
    fn test_inactive_is_not_reversible() {
        let mut tx = TransactionRecord::new(TransactionKind::Debit, dec!(10));
        tx.is_active = false;
        assert!(!tx.is_reversible());
    }

    #[test]
    fn test_other_scope_is_reversible() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(10)).with_scope("hajj");
        assert!(tx.is_reversible());
    }

    #[test]
    fn test_record_matches_code_and_id() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(1)).with_code("TRX-42");
        assert!(tx.matches(&TransactionLookup::Code("TRX-42".to_string())));
        assert!(tx.matches(&TransactionLookup::Id(tx.id)));
        assert!(!tx.matches(&TransactionLookup::Code("TRX-43".to_string())));
    }

    #[test]
    fn test_generated_code_shape() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(1));
        assert!(tx.transaction_code.starts_with("TRX-"));
        assert_eq!(tx.transaction_code.len(), 12);
        assert!(TransactionLookup::parse(&tx.transaction_code).is_ok());
    }
}
