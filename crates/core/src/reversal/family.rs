//! Pilgrim family aggregate recomputation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use safar_shared::types::PartyId;

use crate::reversal::party::{PartyHandle, PartyStore};
use crate::reversal::store::{ReversalSession, StoreResult};

/// Amounts contributed by one family member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    /// Member id.
    pub id: PartyId,
    /// Package price.
    pub total_amount: Decimal,
    /// Amount paid so far.
    pub paid_amount: Decimal,
    /// Amount still due.
    pub total_due: Decimal,
}

/// Totals across every active member of a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyTotals {
    /// Store the family belongs to.
    pub store: PartyStore,
    /// Family identifier.
    pub family_id: String,
    /// Number of active members.
    pub member_count: u32,
    /// Sum of package prices.
    pub total_amount: Decimal,
    /// Sum of paid amounts.
    pub paid_amount: Decimal,
    /// Sum of dues.
    pub total_due: Decimal,
    /// When the totals were computed.
    pub computed_at: DateTime<Utc>,
}

impl FamilyTotals {
    /// Sums the members of one family.
    #[must_use]
    pub fn from_members(
        store: PartyStore,
        family_id: &str,
        members: &[FamilyMember],
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            family_id: family_id.to_string(),
            member_count: u32::try_from(members.len()).unwrap_or(u32::MAX),
            total_amount: members.iter().map(|m| m.total_amount).sum(),
            paid_amount: members.iter().map(|m| m.paid_amount).sum(),
            total_due: members.iter().map(|m| m.total_due).sum(),
            computed_at,
        }
    }
}

/// Refreshes the totals of the member's family through the caller's session.
///
/// Reads go through `session` so they observe the writes the caller has just
/// made. Members without a family are a no-op and return `None`.
pub async fn recompute_family(
    session: &mut dyn ReversalSession,
    member: &PartyHandle,
    computed_at: DateTime<Utc>,
) -> StoreResult<Option<FamilyTotals>> {
    let Some(family_id) = member
        .family_id
        .as_deref()
        .filter(|family| !family.trim().is_empty())
    else {
        return Ok(None);
    };

    let members = session.family_members(member.store, family_id).await?;
    let totals = FamilyTotals::from_members(member.store, family_id, &members, computed_at);
    session.store_family_totals(&totals).await?;

    debug!(
        store = %member.store,
        family_id,
        members = totals.member_count,
        paid_amount = %totals.paid_amount,
        "Family totals recomputed"
    );

    Ok(Some(totals))
}
