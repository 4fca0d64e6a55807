use crate::config::{LedgerConfig, Metric, PlanTier, QUOTA_RETENTION_DAYS};
use crate::error::{LedgerError, Result, to_delta};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub allowed: bool,
    /// Counter value after the call; unchanged when not allowed
    pub used: u64,
    pub limit: u64,
}

/// Billing period key, `YYYY-MM`
pub fn period_of(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

fn retention() -> Duration {
    Duration::from_secs(QUOTA_RETENTION_DAYS as u64 * 24 * 60 * 60)
}

/// Monthly per-organization counters
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    fn key(org: &str, period: &str, metric: Metric) -> String {
        format!("quota:{}:{}:{}", org, period, metric)
    }

    /// Reserve `amount` of `metric` if it fits under the tier's limit.
    ///
    /// The counter is incremented first and rolled back if the new value
    /// overshoots, so concurrent callers can never both consume the same
    /// headroom. A zero amount only reads.
    pub async fn check_and_reserve(
        &self,
        org: &str,
        metric: Metric,
        amount: u64,
        tier: PlanTier,
    ) -> Result<Reservation> {
        self.check_and_reserve_at(org, metric, amount, tier, Utc::now())
            .await
    }

    pub async fn check_and_reserve_at(
        &self,
        org: &str,
        metric: Metric,
        amount: u64,
        tier: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let limit = self.config.limits.limit(tier, metric);
        let key = Self::key(org, &period_of(now), metric);

        if amount == 0 {
            let used = self.store.get(&key).await?.unwrap_or(0).max(0) as u64;
            return Ok(Reservation {
                allowed: used <= limit,
                used,
                limit,
            });
        }

        let delta = to_delta(amount)?;
        let after = self
            .store
            .atomic_increment(&key, delta, Some(retention()))
            .await?;

        if after > to_delta(limit)? {
            let rolled_back = self.store.atomic_increment(&key, -delta, None).await?;
            log::info!(
                "Quota rejected for {} ({}): {} + {} exceeds {}",
                org,
                metric,
                after - delta,
                amount,
                limit
            );
            return Ok(Reservation {
                allowed: false,
                used: rolled_back.max(0) as u64,
                limit,
            });
        }

        log::debug!("Reserved {} {} for {} ({}/{})", amount, metric, org, after, limit);
        Ok(Reservation {
            allowed: true,
            used: after as u64,
            limit,
        })
    }

    /// [`check_and_reserve`](Self::check_and_reserve), turning a rejection
    /// into [`LedgerError::QuotaExceeded`]
    pub async fn reserve(
        &self,
        org: &str,
        metric: Metric,
        amount: u64,
        tier: PlanTier,
    ) -> Result<Reservation> {
        let reservation = self.check_and_reserve(org, metric, amount, tier).await?;
        if reservation.allowed {
            Ok(reservation)
        } else {
            Err(LedgerError::QuotaExceeded {
                metric,
                used: reservation.used,
                limit: reservation.limit,
                requested: amount,
            })
        }
    }

    /// Current period's counter
    pub async fn usage(&self, org: &str, metric: Metric) -> Result<u64> {
        self.usage_at(org, metric, Utc::now()).await
    }

    pub async fn usage_at(&self, org: &str, metric: Metric, now: DateTime<Utc>) -> Result<u64> {
        let key = Self::key(org, &period_of(now), metric);
        Ok(self.store.get(&key).await?.unwrap_or(0).max(0) as u64)
    }
}
