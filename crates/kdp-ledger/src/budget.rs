//! Rolling 24-hour cost caps, per user and across the whole system.
//!
//! Spend is recorded into hourly buckets; a check sums the current hour and
//! the 23 before it. Store failures reject the request: the caps never
//! degrade to allow.

use crate::config::LedgerConfig;
use crate::error::{CapScope, LedgerError, Result, to_delta};
use crate::store::LedgerStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

const WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct CostGuard {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

fn bucket(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H").to_string()
}

fn user_prefix(user: &str) -> String {
    format!("cost:user:{}", user)
}

const GLOBAL_PREFIX: &str = "cost:global";

impl CostGuard {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    /// Fail if `estimated_cents` on top of the last 24h of committed spend
    /// would exceed the user's or the global cap
    pub async fn assert_daily_cost_cap(&self, user: &str, estimated_cents: u64) -> Result<()> {
        self.assert_daily_cost_cap_at(user, estimated_cents, Utc::now())
            .await
    }

    pub async fn assert_daily_cost_cap_at(
        &self,
        user: &str,
        estimated_cents: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let caps = self.config.caps;
        let checks = [
            (CapScope::User, user_prefix(user), caps.user_daily_cents),
            (CapScope::Global, GLOBAL_PREFIX.to_string(), caps.global_daily_cents),
        ];

        for (scope, prefix, cap) in checks {
            let committed = match self.window_total(&prefix, now).await {
                Ok(total) => total,
                Err(e) => {
                    log::error!("Rejecting request: {} cost cap unreadable: {}", scope, e);
                    return Err(e);
                }
            };

            let projected = committed.saturating_add(estimated_cents);
            if projected > cap {
                log::info!(
                    "Daily {} cap reached for {}: {} + {} > {}",
                    scope,
                    user,
                    committed,
                    estimated_cents,
                    cap
                );
                return Err(LedgerError::DailyCapExceeded {
                    scope,
                    committed,
                    estimate: estimated_cents,
                    cap,
                });
            }
            if projected as f64 >= cap as f64 * caps.warn_ratio {
                log::warn!(
                    "Approaching daily {} cost cap: {} of {} cents",
                    scope,
                    projected,
                    cap
                );
            }
        }

        Ok(())
    }

    /// Commit spend against both the user's and the global window
    pub async fn record_cost(&self, user: &str, cents: u64) -> Result<()> {
        self.record_cost_at(user, cents, Utc::now()).await
    }

    pub async fn record_cost_at(&self, user: &str, cents: u64, now: DateTime<Utc>) -> Result<()> {
        if cents == 0 {
            return Ok(());
        }
        let delta = to_delta(cents)?;
        let ttl = Some(Duration::from_secs((WINDOW_HOURS as u64 + 1) * 3600));
        let hour = bucket(now);

        self.store
            .atomic_increment(&format!("{}:{}", user_prefix(user), hour), delta, ttl)
            .await?;
        self.store
            .atomic_increment(&format!("{}:{}", GLOBAL_PREFIX, hour), delta, ttl)
            .await?;
        Ok(())
    }

    /// Committed spend of `user` over the trailing 24 hours
    pub async fn user_daily_total(&self, user: &str, now: DateTime<Utc>) -> Result<u64> {
        self.window_total(&user_prefix(user), now).await
    }

    pub async fn global_daily_total(&self, now: DateTime<Utc>) -> Result<u64> {
        self.window_total(GLOBAL_PREFIX, now).await
    }

    async fn window_total(&self, prefix: &str, now: DateTime<Utc>) -> Result<u64> {
        let mut total = 0u64;
        for hours_ago in 0..WINDOW_HOURS {
            let at = now - ChronoDuration::hours(hours_ago);
            let key = format!("{}:{}", prefix, bucket(at));
            let spent = self.store.get(&key).await?.unwrap_or(0).max(0) as u64;
            total = total.saturating_add(spent);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;
    use chrono::TimeZone;

    fn guard() -> (Arc<MemoryLedgerStore>, CostGuard) {
        let store = Arc::new(MemoryLedgerStore::new());
        let guard = CostGuard::new(store.clone(), Arc::new(LedgerConfig::default()));
        (store, guard)
    }

    #[tokio::test]
    async fn spend_leaves_the_window_after_a_day() {
        let (_, guard) = guard();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap();
        guard.record_cost_at("u", 150, start).await.unwrap();

        let later = start + ChronoDuration::hours(23);
        assert_eq!(guard.user_daily_total("u", later).await.unwrap(), 150);
        assert!(guard.assert_daily_cost_cap_at("u", 60, later).await.is_err());

        let next_day = start + ChronoDuration::hours(24);
        assert_eq!(guard.user_daily_total("u", next_day).await.unwrap(), 0);
        assert!(guard.assert_daily_cost_cap_at("u", 60, next_day).await.is_ok());
    }

    #[tokio::test]
    async fn bucket_is_hourly() {
        let at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(bucket(at), "2025123123");
    }
}
