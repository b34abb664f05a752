//! Transaction reversal engine.
//!
//! Deleting a transaction must undo everything its creation did. The engine
//! resolves the transaction, computes its [`ReversalPlan`], applies the plan
//! to ledger accounts, the counter-party and the expense category, deletes the
//! record and commits, all inside one unit of work. Unlinking a money-exchange
//! record is best-effort and runs only after the commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use safar_shared::types::TransactionId;
use safar_shared::{FamilyRecomputeMode, ReversalConfig};

use crate::reversal::error::{ReversalError, StoreError};
use crate::reversal::family::{FamilyTotals, recompute_family};
use crate::reversal::party::{PartyDelta, PartyHandle, PartyRule, PartyVariant};
use crate::reversal::plan::{AccountAdjustment, ReversalPlan};
use crate::reversal::store::{ReversalSession, ReversalStore, StoreResult};
use crate::reversal::types::{
    AdjustmentKind, HistoryEntry, PartyType, TransactionLookup, TransactionRecord,
};

/// Engine behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReversalOptions {
    /// What to do when family totals cannot be refreshed.
    pub family_recompute: FamilyRecomputeMode,
}

impl From<&ReversalConfig> for ReversalOptions {
    fn from(config: &ReversalConfig) -> Self {
        Self {
            family_recompute: config.family_recompute,
        }
    }
}

/// An account adjustment and whether the account still existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedAdjustment {
    /// Planned adjustment.
    pub adjustment: AccountAdjustment,
    /// False if the account was gone and nothing was written.
    pub applied: bool,
}

/// What happened on the party side of a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PartyOutcome {
    /// The transaction carries no usable party reference.
    NotApplicable,
    /// The variant's rule leaves aggregates untouched for this kind.
    NoEffect {
        /// Party variant.
        variant: PartyVariant,
    },
    /// The variant has no reversal rule yet.
    Unspecified {
        /// Party variant.
        variant: PartyVariant,
    },
    /// No store holds a party with the reference.
    Unresolved {
        /// Party variant.
        variant: PartyVariant,
        /// Reference that failed to resolve.
        reference: String,
    },
    /// The delta was applied.
    Applied {
        /// Resolved party.
        party: PartyHandle,
        /// Applied delta.
        delta: PartyDelta,
    },
}

/// Summary of a committed reversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalReport {
    /// Deleted transaction.
    pub transaction_id: TransactionId,
    /// Its human-readable code.
    pub transaction_code: String,
    /// Ledger account adjustments.
    pub accounts: Vec<AppliedAdjustment>,
    /// Party-side outcome.
    pub party: PartyOutcome,
    /// Whether an expense category rollup was adjusted.
    pub category_adjusted: bool,
    /// Refreshed family totals, if a pilgrim's family was recomputed.
    pub family: Option<FamilyTotals>,
    /// Whether a money-exchange link was cleared after commit.
    pub exchange_unlinked: bool,
}

/// Reverses and deletes financial transactions.
#[derive(Clone)]
pub struct ReversalEngine {
    store: Arc<dyn ReversalStore>,
    options: ReversalOptions,
}

impl std::fmt::Debug for ReversalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReversalEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ReversalEngine {
    /// Creates an engine with default options.
    #[must_use]
    pub fn new(store: Arc<dyn ReversalStore>) -> Self {
        Self::with_options(store, ReversalOptions::default())
    }

    /// Creates an engine with explicit options.
    #[must_use]
    pub fn with_options(store: Arc<dyn ReversalStore>, options: ReversalOptions) -> Self {
        Self { store, options }
    }

    /// Returns the engine options.
    #[must_use]
    pub const fn options(&self) -> ReversalOptions {
        self.options
    }

    /// Computes the reversal plan without applying it.
    ///
    /// The lookup runs in a unit of work that is always rolled back.
    pub async fn preview(&self, raw_id: &str) -> Result<ReversalPlan, ReversalError> {
        let lookup = TransactionLookup::parse(raw_id)?;
        let mut session = self.store.begin().await?;

        let found = session.find_transaction(&lookup).await;
        if let Err(err) = session.rollback().await {
            warn!(%lookup, error = %err, "Failed to close preview unit of work");
        }

        let record = found?
            .filter(TransactionRecord::is_reversible)
            .ok_or_else(|| ReversalError::NotFound(lookup.to_string()))?;

        Ok(ReversalPlan::build(&record))
    }

    /// Reverses every side effect of a transaction and deletes it.
    ///
    /// Either all ledger, party and category changes plus the delete are
    /// committed together, or none are. A failure leaves storage exactly as it
    /// was, so the caller may retry.
    ///
    /// # Errors
    ///
    /// - `InvalidId` if `raw_id` is malformed (storage is not touched)
    /// - `NotFound` if no reversible transaction matches
    /// - `Storage` if any step of the unit of work failed
    pub async fn reverse_and_delete(&self, raw_id: &str) -> Result<ReversalReport, ReversalError> {
        let lookup = TransactionLookup::parse(raw_id)?;
        let mut session = self.store.begin().await?;

        let outcome = self.apply(session.as_mut(), &lookup).await;
        let (plan, mut report) = match outcome {
            Ok(applied) => applied,
            Err(err) => {
                abort(session.as_mut(), &lookup).await;
                return Err(err);
            }
        };

        if let Err(err) = session.commit().await {
            error!(%lookup, error = %err, "Commit failed");
            abort(session.as_mut(), &lookup).await;
            return Err(err.into());
        }
        drop(session);

        report.exchange_unlinked = self.unlink_exchange(&plan).await;

        info!(
            transaction_id = %report.transaction_id,
            code = %report.transaction_code,
            kind = %plan.kind,
            amount = %plan.amount,
            accounts = report.accounts.len(),
            party = ?report.party,
            category_adjusted = report.category_adjusted,
            exchange_unlinked = report.exchange_unlinked,
            "Transaction reversed and deleted"
        );

        Ok(report)
    }

    async fn apply(
        &self,
        session: &mut dyn ReversalSession,
        lookup: &TransactionLookup,
    ) -> Result<(ReversalPlan, ReversalReport), ReversalError> {
        let record = session
            .find_transaction(lookup)
            .await?
            .filter(TransactionRecord::is_reversible)
            .ok_or_else(|| ReversalError::NotFound(lookup.to_string()))?;

        let plan = ReversalPlan::build(&record);
        let now = Utc::now();
        let note = plan.history_note();

        // Rows are locked in account id order so that crossing transfers
        // cannot deadlock. The report keeps the plan's role order.
        let mut lock_order: Vec<usize> = (0..plan.accounts.len()).collect();
        lock_order.sort_by_key(|&i| plan.accounts[i].account_id);

        let mut applied_flags = vec![false; plan.accounts.len()];
        for i in lock_order {
            let adjustment = &plan.accounts[i];
            let entry = HistoryEntry {
                amount: adjustment.delta,
                kind: AdjustmentKind::Reversal,
                note: note.clone(),
                transaction_id: Some(record.id),
                recorded_at: now,
            };
            let applied = session.adjust_account(adjustment.account_id, &entry).await?;
            if !applied {
                debug!(
                    account_id = %adjustment.account_id,
                    code = %record.transaction_code,
                    "Ledger account no longer exists, nothing to reverse"
                );
            }
            applied_flags[i] = applied;
        }
        let accounts: Vec<AppliedAdjustment> = plan
            .accounts
            .iter()
            .zip(applied_flags)
            .map(|(adjustment, applied)| AppliedAdjustment {
                adjustment: *adjustment,
                applied,
            })
            .collect();

        let (party, family) = self.reverse_party(session, &plan, now).await?;

        let category_adjusted = match &plan.category {
            Some(adjustment) => {
                let found = session
                    .adjust_category(adjustment, now.date_naive())
                    .await?;
                if !found {
                    debug!(category_id = %adjustment.category_id, "Expense category missing");
                }
                found
            }
            None => false,
        };

        let deleted = session.delete_transaction(record.id).await?;
        if deleted == 0 {
            return Err(StoreError::Inconsistent(format!(
                "transaction {} was not deleted",
                record.transaction_code
            ))
            .into());
        }

        let report = ReversalReport {
            transaction_id: record.id,
            transaction_code: record.transaction_code,
            accounts,
            party,
            category_adjusted,
            family,
            exchange_unlinked: false,
        };

        Ok((plan, report))
    }

    async fn reverse_party(
        &self,
        session: &mut dyn ReversalSession,
        plan: &ReversalPlan,
        now: DateTime<Utc>,
    ) -> Result<(PartyOutcome, Option<FamilyTotals>), ReversalError> {
        let Some(party) = &plan.party else {
            if let Some(PartyType::Other(raw)) = &plan.party_type {
                debug!(party_type = %raw, code = %plan.transaction_code, "Unknown party type");
            }
            return Ok((PartyOutcome::NotApplicable, None));
        };
        let variant = party.variant;

        let (delta, recompute) = match party.rule {
            PartyRule::Apply {
                delta,
                recompute_family,
            } => (delta, recompute_family),
            PartyRule::NoEffect => return Ok((PartyOutcome::NoEffect { variant }, None)),
            PartyRule::Unspecified => {
                warn!(
                    %variant,
                    reference = %party.reference,
                    code = %plan.transaction_code,
                    "No reversal rule defined for party variant, aggregates left untouched"
                );
                return Ok((PartyOutcome::Unspecified { variant }, None));
            }
        };

        let Some(handle) = resolve_party(session, variant, &party.reference).await? else {
            debug!(%variant, reference = %party.reference, "Party not found");
            return Ok((
                PartyOutcome::Unresolved {
                    variant,
                    reference: party.reference.clone(),
                },
                None,
            ));
        };

        session.apply_party_delta(&handle, &delta).await?;

        let family = if recompute {
            self.refresh_family(session, &handle, now).await?
        } else {
            None
        };

        Ok((
            PartyOutcome::Applied {
                party: handle,
                delta,
            },
            family,
        ))
    }

    async fn refresh_family(
        &self,
        session: &mut dyn ReversalSession,
        member: &PartyHandle,
        now: DateTime<Utc>,
    ) -> Result<Option<FamilyTotals>, ReversalError> {
        match recompute_family(session, member, now).await {
            Ok(totals) => Ok(totals),
            Err(err) => match self.options.family_recompute {
                FamilyRecomputeMode::Advisory => {
                    warn!(
                        party_id = %member.id,
                        family_id = ?member.family_id,
                        error = %err,
                        "Family recompute failed, continuing"
                    );
                    Ok(None)
                }
                FamilyRecomputeMode::Propagate => Err(err.into()),
            },
        }
    }

    async fn unlink_exchange(&self, plan: &ReversalPlan) -> bool {
        let Some(exchange_ref) = plan.exchange_unlink.as_deref() else {
            return false;
        };

        match self
            .store
            .unlink_exchange(exchange_ref, plan.transaction_id)
            .await
        {
            Ok(unlinked) => {
                if !unlinked {
                    debug!(exchange = exchange_ref, "No money-exchange record to unlink");
                }
                unlinked
            }
            Err(err) => {
                warn!(
                    exchange = exchange_ref,
                    code = %plan.transaction_code,
                    error = %err,
                    "Failed to unlink money-exchange record"
                );
                false
            }
        }
    }
}

async fn resolve_party(
    session: &mut dyn ReversalSession,
    variant: PartyVariant,
    reference: &str,
) -> StoreResult<Option<PartyHandle>> {
    for (store, key) in variant.lookup_candidates(reference) {
        if let Some(handle) = session.find_party(store, &key).await? {
            return Ok(Some(handle));
        }
    }
    Ok(None)
}

async fn abort(session: &mut dyn ReversalSession, lookup: &TransactionLookup) {
    if let Err(err) = session.rollback().await {
        error!(%lookup, error = %err, "Rollback failed");
    }
}
