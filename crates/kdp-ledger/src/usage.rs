use crate::config::{LedgerConfig, Metric, QUOTA_RETENTION_DAYS, USAGE_HISTORY_CAPACITY};
use crate::error::{LedgerError, Result};
use crate::quota::period_of;
use crate::store::{LedgerStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One recorded unit of consumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub at: DateTime<Utc>,
    pub amount: u64,
}

/// Bounded trailing history of usage, for trend reporting
#[derive(Clone)]
pub struct UsageHistory {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl UsageHistory {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    fn key(org: &str, period: &str, metric: Metric) -> String {
        format!("usage:{}:{}:{}", org, period, metric)
    }

    pub async fn record_usage_event(&self, org: &str, metric: Metric, amount: u64) -> Result<()> {
        self.record_usage_event_at(org, metric, amount, Utc::now())
            .await
    }

    /// Append an event; only the newest entries up to the history capacity
    /// are kept per (org, metric, period)
    pub async fn record_usage_event_at(
        &self,
        org: &str,
        metric: Metric,
        amount: u64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let key = Self::key(org, &period_of(at), metric);
        let entry = serde_json::to_string(&UsageEvent { at, amount })
            .map_err(|e| LedgerError::Config(format!("Failed to encode usage event: {}", e)))?;
        let ttl = Duration::from_secs(QUOTA_RETENTION_DAYS as u64 * 24 * 60 * 60);

        let result = self
            .store
            .bounded_list_append(&key, entry, USAGE_HISTORY_CAPACITY, Some(ttl))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Unavailable(namespace)) if self.config.flags.usage_history_fail_open => {
                log::warn!(
                    "Usage history storage '{}' unavailable, dropping {} {} event for {}",
                    namespace,
                    amount,
                    metric,
                    org
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Events of the current period, oldest first
    pub async fn trend(&self, org: &str, metric: Metric) -> Result<Vec<UsageEvent>> {
        self.trend_at(org, metric, Utc::now()).await
    }

    pub async fn trend_at(
        &self,
        org: &str,
        metric: Metric,
        at: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>> {
        let key = Self::key(org, &period_of(at), metric);
        let entries = match self.store.list(&key).await {
            Ok(entries) => entries,
            Err(StoreError::Unavailable(_)) if self.config.flags.usage_history_fail_open => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_str(&entry) {
                Ok(event) => events.push(event),
                Err(e) => log::debug!("Skipping malformed usage entry in {}: {}", key, e),
            }
        }
        Ok(events)
    }
}
