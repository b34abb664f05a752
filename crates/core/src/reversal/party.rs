//! Counter-party variants and their reversal delta rules.
//!
//! Every variant owns one rule describing how deleting a transaction moves
//! that party's aggregates. The engine dispatches on the variant tag and
//! never inspects store rows to decide what to do.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use safar_shared::types::PartyId;

use crate::reversal::plan::CategoryTags;
use crate::reversal::types::TransactionKind;

/// Closed set of counter-party variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyVariant {
    /// Travel agent (B2B client).
    Agent,
    /// Supplier the agency pays.
    Vendor,
    /// Retail customer.
    Customer,
    /// Hajj pilgrim.
    Haji,
    /// Umrah pilgrim.
    Umrah,
    /// Loan counter-party.
    Loan,
    /// Investment counter-party.
    Investment,
    /// Asset counter-party.
    Asset,
    /// Employee.
    Employee,
}

impl PartyVariant {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::Haji => "haji",
            Self::Umrah => "umrah",
            Self::Loan => "loan",
            Self::Investment => "investment",
            Self::Asset => "asset",
            Self::Employee => "employee",
        }
    }

    /// Computes the inverse of what the forward path did to this party.
    ///
    /// `due` is the agent/customer due delta: `+amount` for credits,
    /// `-amount` for debits, zero for transfers. Vendors use the opposite sign
    /// because a debit to a vendor is money owed to them.
    #[must_use]
    pub fn reversal_rule(
        self,
        kind: TransactionKind,
        amount: Decimal,
        tags: CategoryTags,
    ) -> PartyRule {
        let due = match kind {
            TransactionKind::Credit => amount,
            TransactionKind::Debit => -amount,
            TransactionKind::Transfer => Decimal::ZERO,
        };

        let delta = match self {
            Self::Agent => PartyDelta {
                total_deposit: credit_only(kind, -amount),
                ..PartyDelta::dues(due, tags)
            },
            Self::Vendor => PartyDelta {
                total_paid: if kind == TransactionKind::Debit {
                    -amount
                } else {
                    Decimal::ZERO
                },
                ..PartyDelta::dues(-due, tags)
            },
            Self::Customer => PartyDelta {
                paid_amount: credit_only(kind, -amount),
                ..PartyDelta::dues(due, tags)
            },
            Self::Haji | Self::Umrah => {
                if kind != TransactionKind::Credit {
                    return PartyRule::NoEffect;
                }
                return PartyRule::Apply {
                    delta: PartyDelta {
                        paid_amount: -amount,
                        ..PartyDelta::default()
                    },
                    recompute_family: true,
                };
            }
            Self::Loan | Self::Investment | Self::Asset | Self::Employee => {
                return PartyRule::Unspecified;
            }
        };

        if delta.is_zero() {
            PartyRule::NoEffect
        } else {
            PartyRule::Apply {
                delta,
                recompute_family: false,
            }
        }
    }

    /// Physical stores searched for this variant, in lookup order.
    #[must_use]
    pub const fn stores(self) -> &'static [PartyStore] {
        match self {
            Self::Agent => &[PartyStore::Agent],
            Self::Vendor => &[PartyStore::Vendor],
            Self::Customer => &[PartyStore::Customer, PartyStore::AirCustomer],
            Self::Haji => &[PartyStore::Haji],
            Self::Umrah => &[PartyStore::Umrah],
            Self::Loan | Self::Investment | Self::Asset | Self::Employee => &[],
        }
    }

    /// Store/key pairs to try, in order, when resolving a party reference.
    ///
    /// Each store is tried by internal id first (when the reference is a
    /// UUID), then by business code, then by alias where the store has one.
    #[must_use]
    pub fn lookup_candidates(self, reference: &str) -> Vec<(PartyStore, PartyKey)> {
        let id = Uuid::parse_str(reference).ok().map(PartyId::from_uuid);
        let mut candidates = Vec::new();

        for &store in self.stores() {
            if let Some(id) = id {
                candidates.push((store, PartyKey::Id(id)));
            }
            candidates.push((store, PartyKey::Code(reference.to_string())));
            if store.has_alias() {
                candidates.push((store, PartyKey::Alias(reference.to_string())));
            }
        }

        candidates
    }
}

impl fmt::Display for PartyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn credit_only(kind: TransactionKind, value: Decimal) -> Decimal {
    if kind == TransactionKind::Credit {
        value
    } else {
        Decimal::ZERO
    }
}

/// A physical party store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyStore {
    /// Agents.
    Agent,
    /// Vendors.
    Vendor,
    /// Primary customer store.
    Customer,
    /// Secondary (airline ticketing) customer store.
    AirCustomer,
    /// Hajj pilgrims.
    Haji,
    /// Umrah pilgrims.
    Umrah,
}

impl PartyStore {
    /// Returns the storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::AirCustomer => "air_customer",
            Self::Haji => "haji",
            Self::Umrah => "umrah",
        }
    }

    /// Returns true if rows in this store carry a customer alias.
    #[must_use]
    pub const fn has_alias(self) -> bool {
        matches!(self, Self::AirCustomer)
    }

    /// Returns true if members of this store are grouped into families.
    #[must_use]
    pub const fn has_families(self) -> bool {
        matches!(self, Self::Haji | Self::Umrah)
    }
}

impl fmt::Display for PartyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key used to find a party row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum PartyKey {
    /// Internal identifier.
    Id(PartyId),
    /// Business code.
    Code(String),
    /// Alternate customer id (secondary customer store only).
    Alias(String),
}

/// A resolved party row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyHandle {
    /// Store the row lives in.
    pub store: PartyStore,
    /// Internal identifier.
    pub id: PartyId,
    /// Family the member belongs to (pilgrims only).
    pub family_id: Option<String>,
}

/// Signed changes to a party's aggregates. Zero means untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartyDelta {
    /// Change to `total_due`.
    pub total_due: Decimal,
    /// Change to the hajj due sub-total.
    pub hajj_due: Decimal,
    /// Change to the umrah due sub-total.
    pub umrah_due: Decimal,
    /// Change to an agent's `total_deposit`.
    pub total_deposit: Decimal,
    /// Change to a vendor's `total_paid`.
    pub total_paid: Decimal,
    /// Change to a customer's or pilgrim's `paid_amount`.
    pub paid_amount: Decimal,
}

impl PartyDelta {
    /// Due delta applied to the total and to each tagged sub-total.
    #[must_use]
    pub fn dues(due: Decimal, tags: CategoryTags) -> Self {
        Self {
            total_due: due,
            hajj_due: if tags.hajj { due } else { Decimal::ZERO },
            umrah_due: if tags.umrah { due } else { Decimal::ZERO },
            ..Self::default()
        }
    }

    /// Returns true if applying the delta changes nothing.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total_due.is_zero()
            && self.hajj_due.is_zero()
            && self.umrah_due.is_zero()
            && self.total_deposit.is_zero()
            && self.total_paid.is_zero()
            && self.paid_amount.is_zero()
    }
}

/// What reversing a transaction does to one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PartyRule {
    /// Apply the delta; optionally refresh the member's family totals.
    Apply {
        /// Aggregate changes.
        delta: PartyDelta,
        /// Whether family totals must be recomputed afterwards.
        recompute_family: bool,
    },
    /// The transaction never moved this party's aggregates.
    NoEffect,
    /// No reversal rule has been defined for the variant yet.
    Unspecified,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const NONE: CategoryTags = CategoryTags {
        hajj: false,
        umrah: false,
    };
    const HAJJ: CategoryTags = CategoryTags {
        hajj: true,
        umrah: false,
    };
    const UMRAH: CategoryTags = CategoryTags {
        hajj: false,
        umrah: true,
    };

    fn delta(rule: PartyRule) -> PartyDelta {
        match rule {
            PartyRule::Apply { delta, .. } => delta,
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn test_agent_credit_raises_due_and_lowers_deposit() {
        let d = delta(PartyVariant::Agent.reversal_rule(TransactionKind::Credit, dec!(200), HAJJ));
        assert_eq!(d.total_due, dec!(200));
        assert_eq!(d.hajj_due, dec!(200));
        assert_eq!(d.umrah_due, Decimal::ZERO);
        assert_eq!(d.total_deposit, dec!(-200));
    }

    #[test]
    fn test_agent_debit_lowers_due_only() {
        let d = delta(PartyVariant::Agent.reversal_rule(TransactionKind::Debit, dec!(75), UMRAH));
        assert_eq!(d.total_due, dec!(-75));
        assert_eq!(d.umrah_due, dec!(-75));
        assert_eq!(d.hajj_due, Decimal::ZERO);
        assert_eq!(d.total_deposit, Decimal::ZERO);
    }

    #[test]
    fn test_vendor_sign_is_inverted() {
        let d = delta(PartyVariant::Vendor.reversal_rule(TransactionKind::Debit, dec!(150), NONE));
        assert_eq!(d.total_due, dec!(150));
        assert_eq!(d.total_paid, dec!(-150));

        let d = delta(PartyVariant::Vendor.reversal_rule(TransactionKind::Credit, dec!(150), NONE));
        assert_eq!(d.total_due, dec!(-150));
        assert_eq!(d.total_paid, Decimal::ZERO);
    }

    #[test]
    fn test_customer_credit_lowers_paid_amount() {
        let d = delta(PartyVariant::Customer.reversal_rule(
            TransactionKind::Credit,
            dec!(90),
            CategoryTags {
                hajj: true,
                umrah: true,
            },
        ));
        assert_eq!(d.total_due, dec!(90));
        assert_eq!(d.hajj_due, dec!(90));
        assert_eq!(d.umrah_due, dec!(90));
        assert_eq!(d.paid_amount, dec!(-90));
    }

    #[test]
    fn test_transfer_has_no_party_effect() {
        for variant in [PartyVariant::Agent, PartyVariant::Vendor, PartyVariant::Customer] {
            assert_eq!(
                variant.reversal_rule(TransactionKind::Transfer, dec!(10), HAJJ),
                PartyRule::NoEffect
            );
        }
    }

    #[test]
    fn test_pilgrim_credit_recomputes_family() {
        for variant in [PartyVariant::Haji, PartyVariant::Umrah] {
            let rule = variant.reversal_rule(TransactionKind::Credit, dec!(300), NONE);
            assert_eq!(
                rule,
                PartyRule::Apply {
                    delta: PartyDelta {
                        paid_amount: dec!(-300),
                        ..PartyDelta::default()
                    },
                    recompute_family: true,
                }
            );
        }
    }

    #[test]
    fn test_pilgrim_debit_is_no_effect() {
        assert_eq!(
            PartyVariant::Haji.reversal_rule(TransactionKind::Debit, dec!(300), NONE),
            PartyRule::NoEffect
        );
    }

    #[test]
    fn test_extension_variants_are_unspecified() {
        for variant in [
            PartyVariant::Loan,
            PartyVariant::Investment,
            PartyVariant::Asset,
            PartyVariant::Employee,
        ] {
            assert_eq!(
                variant.reversal_rule(TransactionKind::Credit, dec!(1), NONE),
                PartyRule::Unspecified
            );
            assert!(variant.stores().is_empty());
        }
    }

    #[test]
    fn test_zero_amount_is_no_effect() {
        assert_eq!(
            PartyVariant::Agent.reversal_rule(TransactionKind::Debit, Decimal::ZERO, HAJJ),
            PartyRule::NoEffect
        );
    }

    #[test]
    fn test_customer_lookup_order() {
        let id = Uuid::new_v4();
        let candidates = PartyVariant::Customer.lookup_candidates(&id.to_string());
        let stores: Vec<_> = candidates.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stores,
            vec![
                PartyStore::Customer,
                PartyStore::Customer,
                PartyStore::AirCustomer,
                PartyStore::AirCustomer,
                PartyStore::AirCustomer,
            ]
        );
        assert_eq!(candidates[0].1, PartyKey::Id(PartyId::from_uuid(id)));
        assert_eq!(candidates[1].1, PartyKey::Code(id.to_string()));
        assert_eq!(candidates[4].1, PartyKey::Alias(id.to_string()));
    }

    #[test]
    fn test_code_reference_skips_id_lookup() {
        let candidates = PartyVariant::Vendor.lookup_candidates("VEN-0007");
        assert_eq!(
            candidates,
            vec![(PartyStore::Vendor, PartyKey::Code("VEN-0007".to_string()))]
        );
    }
}
