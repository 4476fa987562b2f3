//! Per-user quota admission.

use atelier_core::{Plan, TierCeilings, UsageCharge, UsageRecord, UsageSnapshot};
use atelier_error::{AtelierResult, QuotaExceeded, QuotaKind};
use atelier_interface::{AdmitGuard, UsageStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What a generation asks the ledger for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitRequest {
    /// Units in the batch
    pub units: u32,
    /// Credits the batch costs
    pub credit_cost: u64,
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Inference steps
    pub steps: u32,
    /// Whether upscaling was requested
    pub upscale: bool,
}

/// Quota check result exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReport {
    /// Caller's plan
    pub plan: Plan,
    /// Current usage
    pub usage: UsageSnapshot,
}

/// Admits generations against plan limits and records what they consume.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. monthly credits, reporting the credits left
/// 2. units per generation, reporting the plan cap
/// 3. tier ceilings on size, steps and upscaling
///
/// The checks and the increment happen inside one [`UsageStore::admit`] call, so two
/// concurrent requests can never both pass against the same usage figures.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn UsageStore>,
    tiers: HashMap<String, TierCeilings>,
}

impl std::fmt::Debug for QuotaLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaLedger")
            .field("tiers", &self.tiers)
            .finish_non_exhaustive()
    }
}

impl QuotaLedger {
    /// Ledger over `store` with ceilings per restricted tier.
    pub fn new(store: Arc<dyn UsageStore>, tiers: HashMap<String, TierCeilings>) -> Self {
        Self { store, tiers }
    }

    /// Admit `request` for `user_id` under `plan` at the current time.
    pub async fn admit(
        &self,
        user_id: &str,
        request: AdmitRequest,
        plan: &Plan,
    ) -> AtelierResult<UsageSnapshot> {
        self.admit_at(user_id, request, plan, Utc::now()).await
    }

    /// Admit `request` as of `now`.
    #[instrument(skip(self, plan), fields(plan = %plan.name()))]
    pub async fn admit_at(
        &self,
        user_id: &str,
        request: AdmitRequest,
        plan: &Plan,
        now: DateTime<Utc>,
    ) -> AtelierResult<UsageSnapshot> {
        let charge = UsageCharge {
            units: request.units,
            credits: request.credit_cost,
        };
        let guard = self.guard(plan, request);
        match self.store.admit(user_id, charge, guard, now).await {
            Ok(record) => {
                info!(nuts_used = record.nuts_used, "Usage admitted");
                Ok(record.snapshot())
            }
            Err(err) => {
                if let Some(quota) = err.as_quota() {
                    warn!(kind = %quota.kind, remaining = quota.remaining, "Quota exceeded");
                }
                Err(err)
            }
        }
    }

    /// Current usage with period rollover applied.
    pub async fn snapshot(&self, user_id: &str) -> AtelierResult<UsageSnapshot> {
        self.snapshot_at(user_id, Utc::now()).await
    }

    /// Usage as of `now`.
    pub async fn snapshot_at(&self, user_id: &str, now: DateTime<Utc>) -> AtelierResult<UsageSnapshot> {
        Ok(self.store.load(user_id, now).await?.snapshot())
    }

    fn guard(&self, plan: &Plan, request: AdmitRequest) -> AdmitGuard {
        let plan = plan.clone();
        let ceilings = self.tiers.get(plan.tier()).copied();
        Arc::new(move |record: &UsageRecord| check(&plan, ceilings.as_ref(), &request, record))
    }
}

fn check(
    plan: &Plan,
    ceilings: Option<&TierCeilings>,
    request: &AdmitRequest,
    record: &UsageRecord,
) -> Result<(), QuotaExceeded> {
    let over_cap = (*plan.nuts_per_month())
        .filter(|cap| record.nuts_used.saturating_add(request.credit_cost) > *cap);
    if let Some(cap) = over_cap {
        return Err(QuotaExceeded::new(
            QuotaKind::MonthlyCredits,
            cap.saturating_sub(record.nuts_used),
            format!(
                "{} credits requested, {} of {} used this month",
                request.credit_cost, record.nuts_used, cap
            ),
        ));
    }
    let per_generation = *plan.images_per_generation();
    if request.units > per_generation {
        return Err(QuotaExceeded::new(
            QuotaKind::PerGenerationCap,
            u64::from(per_generation),
            format!(
                "{} units requested, plan allows {} per generation",
                request.units, per_generation
            ),
        ));
    }
    if let Some(detail) = ceilings.and_then(|c| {
        c.violation(request.width, request.height, request.steps, request.upscale)
    }) {
        return Err(QuotaExceeded::new(QuotaKind::TierRestriction, 0, detail));
    }
    Ok(())
}
