//! Reversal plan computation.
//!
//! A plan is the complete list of inverse deltas for one transaction. It is
//! computed from the stored record alone, without touching storage, so the
//! same plan backs both the preview endpoint and the engine.

use rust_decimal::Decimal;
use serde::Serialize;

use safar_shared::types::{ExpenseCategoryId, LedgerAccountId, TransactionId};

use crate::reversal::party::{PartyRule, PartyVariant};
use crate::reversal::types::{PartyType, TransactionKind, TransactionRecord};

/// Service-category flags derived from the free-text category label.
///
/// Both flags can be set at once: "haj" also matches "hajj", and a label such
/// as "hajj + umrah combo" matches both substrings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTags {
    /// Label contains "haj".
    pub hajj: bool,
    /// Label contains "umrah".
    pub umrah: bool,
}

impl CategoryTags {
    /// Derives the flags from a category label, ignoring case.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        Self {
            hajj: label.contains("haj"),
            umrah: label.contains("umrah"),
        }
    }
}

/// Which leg of the transaction an account played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Target of a credit or debit.
    Target,
    /// Source of a transfer.
    Source,
    /// Destination of a transfer.
    Destination,
}

/// Balance change for one ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountAdjustment {
    /// Account to adjust.
    pub account_id: LedgerAccountId,
    /// Role of the account in the original transaction.
    pub role: AccountRole,
    /// Signed change to the balance.
    pub delta: Decimal,
}

/// Party-side part of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyReversal {
    /// Variant the transaction was attributed to.
    pub variant: PartyVariant,
    /// Party id or business code as stored on the transaction.
    pub reference: String,
    /// Rule to apply once the party is resolved.
    pub rule: PartyRule,
}

/// Change to an operating-expense category rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryAdjustment {
    /// Category to adjust.
    pub category_id: ExpenseCategoryId,
    /// Change to `total_amount`.
    pub amount_delta: Decimal,
    /// Change to `item_count`.
    pub count_delta: i32,
}

/// Every inverse delta needed to reverse one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalPlan {
    /// Transaction being reversed.
    pub transaction_id: TransactionId,
    /// Its human-readable code.
    pub transaction_code: String,
    /// Its direction.
    pub kind: TransactionKind,
    /// Amount used for every delta.
    pub amount: Decimal,
    /// Service-category flags.
    pub tags: CategoryTags,
    /// Parsed party type, when the transaction carries a complete reference.
    pub party_type: Option<PartyType>,
    /// Ledger account adjustments.
    pub accounts: Vec<AccountAdjustment>,
    /// Party adjustment.
    pub party: Option<PartyReversal>,
    /// Expense category adjustment.
    pub category: Option<CategoryAdjustment>,
    /// Money-exchange record to unlink after commit.
    pub exchange_unlink: Option<String>,
}

impl ReversalPlan {
    /// Computes the plan for a stored transaction.
    #[must_use]
    pub fn build(record: &TransactionRecord) -> Self {
        let amount = record.amount.unwrap_or(Decimal::ZERO);
        let kind = record.kind;
        let tags = record
            .service_category
            .as_deref()
            .map(CategoryTags::from_label)
            .unwrap_or_default();

        let accounts = account_adjustments(record, amount);

        let party_ref = match (record.party_id.as_deref(), record.party_type.as_deref()) {
            (Some(id), Some(kind)) if !id.trim().is_empty() && !kind.trim().is_empty() => {
                Some((id.trim().to_string(), PartyType::parse(kind.trim())))
            }
            _ => None,
        };

        let (party, exchange_unlink) = match &party_ref {
            Some((reference, PartyType::Participant(variant))) => (
                Some(PartyReversal {
                    variant: *variant,
                    reference: reference.clone(),
                    rule: variant.reversal_rule(kind, amount, tags),
                }),
                None,
            ),
            Some((reference, PartyType::MoneyExchange)) => (None, Some(reference.clone())),
            _ => (None, None),
        };

        let category = match (record.expense_category_id, kind) {
            (Some(category_id), TransactionKind::Debit) => Some(CategoryAdjustment {
                category_id,
                amount_delta: -amount,
                count_delta: -1,
            }),
            _ => None,
        };

        Self {
            transaction_id: record.id,
            transaction_code: record.transaction_code.clone(),
            kind,
            amount,
            tags,
            party_type: party_ref.map(|(_, party_type)| party_type),
            accounts,
            party,
            category,
            exchange_unlink,
        }
    }

    /// Note recorded on every balance-history entry written by the plan.
    #[must_use]
    pub fn history_note(&self) -> String {
        format!(
            "Reversal of {} transaction {}",
            self.kind, self.transaction_code
        )
    }
}

fn account_adjustments(record: &TransactionRecord, amount: Decimal) -> Vec<AccountAdjustment> {
    let target = |delta| {
        record.target_account_id.map(|account_id| AccountAdjustment {
            account_id,
            role: AccountRole::Target,
            delta,
        })
    };

    match record.kind {
        TransactionKind::Credit => target(-amount).into_iter().collect(),
        TransactionKind::Debit => target(amount).into_iter().collect(),
        TransactionKind::Transfer => {
            let source = record.from_account_id.map(|account_id| AccountAdjustment {
                account_id,
                role: AccountRole::Source,
                delta: amount,
            });
            let destination = record.target_account_id.map(|account_id| AccountAdjustment {
                account_id,
                role: AccountRole::Destination,
                delta: -amount,
            });
            source.into_iter().chain(destination).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reversal::party::PartyDelta;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("hajj", true, false)]
    #[case("Hajj Package 2026", true, false)]
    #[case("umrah package", false, true)]
    #[case("UMRAH", false, true)]
    #[case("Hajj + Umrah combo", true, true)]
    #[case("air ticket", false, false)]
    #[case("", false, false)]
    fn test_category_tags(#[case] label: &str, #[case] hajj: bool, #[case] umrah: bool) {
        assert_eq!(CategoryTags::from_label(label), CategoryTags { hajj, umrah });
    }

    #[test]
    fn test_credit_plan_reverses_target() {
        let account = LedgerAccountId::new();
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(200))
            .with_target_account(account);

        let plan = ReversalPlan::build(&tx);

        assert_eq!(
            plan.accounts,
            vec![AccountAdjustment {
                account_id: account,
                role: AccountRole::Target,
                delta: dec!(-200),
            }]
        );
        assert!(plan.party.is_none());
        assert!(plan.category.is_none());
    }

    #[test]
    fn test_transfer_plan_has_two_legs() {
        let from = LedgerAccountId::new();
        let to = LedgerAccountId::new();
        let tx = TransactionRecord::new(TransactionKind::Transfer, dec!(100))
            .with_source_account(from)
            .with_target_account(to);

        let plan = ReversalPlan::build(&tx);

        assert_eq!(plan.accounts.len(), 2);
        assert_eq!(plan.accounts[0].account_id, from);
        assert_eq!(plan.accounts[0].delta, dec!(100));
        assert_eq!(plan.accounts[1].account_id, to);
        assert_eq!(plan.accounts[1].delta, dec!(-100));
    }

    #[test]
    fn test_missing_account_reference_is_noop() {
        let tx = TransactionRecord::new(TransactionKind::Debit, dec!(50));
        assert!(ReversalPlan::build(&tx).accounts.is_empty());
    }

    #[test]
    fn test_missing_amount_reverses_as_zero() {
        let mut tx = TransactionRecord::new(TransactionKind::Credit, dec!(1))
            .with_target_account(LedgerAccountId::new());
        tx.amount = None;

        let plan = ReversalPlan::build(&tx);

        assert_eq!(plan.amount, Decimal::ZERO);
        assert_eq!(plan.accounts[0].delta, Decimal::ZERO);
    }

    #[test]
    fn test_debit_with_category_adjusts_rollup() {
        let category = ExpenseCategoryId::new();
        let tx = TransactionRecord::new(TransactionKind::Debit, dec!(40))
            .with_expense_category(category);

        let plan = ReversalPlan::build(&tx);

        assert_eq!(
            plan.category,
            Some(CategoryAdjustment {
                category_id: category,
                amount_delta: dec!(-40),
                count_delta: -1,
            })
        );
    }

    #[test]
    fn test_credit_with_category_leaves_rollup() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(40))
            .with_expense_category(ExpenseCategoryId::new());
        assert!(ReversalPlan::build(&tx).category.is_none());
    }

    #[test]
    fn test_agent_party_plan() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(500))
            .with_party("agent", "AG-001")
            .with_service_category("Hajj");

        let plan = ReversalPlan::build(&tx);
        let party = plan.party.expect("party plan");

        assert_eq!(party.variant, PartyVariant::Agent);
        assert_eq!(party.reference, "AG-001");
        assert_eq!(
            party.rule,
            PartyRule::Apply {
                delta: PartyDelta {
                    total_due: dec!(500),
                    hajj_due: dec!(500),
                    total_deposit: dec!(-500),
                    ..PartyDelta::default()
                },
                recompute_family: false,
            }
        );
    }

    #[test]
    fn test_party_requires_id_and_type() {
        let mut tx = TransactionRecord::new(TransactionKind::Credit, dec!(5));
        tx.party_type = Some("agent".to_string());
        let plan = ReversalPlan::build(&tx);
        assert!(plan.party.is_none());
        assert!(plan.party_type.is_none());

        tx.party_id = Some("   ".to_string());
        assert!(ReversalPlan::build(&tx).party.is_none());
    }

    #[test]
    fn test_money_exchange_party_schedules_unlink() {
        let tx = TransactionRecord::new(TransactionKind::Debit, dec!(5))
            .with_party("money-exchange", "EXC-9");

        let plan = ReversalPlan::build(&tx);

        assert!(plan.party.is_none());
        assert_eq!(plan.exchange_unlink.as_deref(), Some("EXC-9"));
        assert_eq!(plan.party_type, Some(PartyType::MoneyExchange));
    }

    #[test]
    fn test_unknown_party_type_is_kept_for_logging() {
        let tx = TransactionRecord::new(TransactionKind::Debit, dec!(5)).with_party("airline", "X1");
        let plan = ReversalPlan::build(&tx);
        assert!(plan.party.is_none());
        assert_eq!(plan.party_type, Some(PartyType::Other("airline".to_string())));
    }

    #[test]
    fn test_history_note_names_transaction() {
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(1)).with_code("TRX-77");
        assert_eq!(
            ReversalPlan::build(&tx).history_note(),
            "Reversal of credit transaction TRX-77"
        );
    }
}
