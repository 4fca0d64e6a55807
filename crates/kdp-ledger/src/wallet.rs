use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result, to_delta};
use crate::store::{LedgerStore, StoreError};
use std::sync::Arc;

/// Retries before a contended wallet update gives up
const MAX_CAS_ATTEMPTS: usize = 16;

/// Prepaid credit balances, in cents
#[derive(Clone)]
pub struct Wallet {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl Wallet {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    fn key(user: &str) -> String {
        format!("wallet:{}", user)
    }

    pub async fn balance(&self, user: &str) -> Result<i64> {
        Ok(self.store.get(&Self::key(user)).await?.unwrap_or(0))
    }

    /// Add credits, returning the new balance
    pub async fn credit(&self, user: &str, cents: u64) -> Result<i64> {
        let delta = to_delta(cents)?;
        Ok(self
            .store
            .atomic_increment(&Self::key(user), delta, None)
            .await?)
    }

    /// Take `cents` from the balance.
    ///
    /// Fails with [`LedgerError::InsufficientCredits`] without touching the
    /// balance when it is too low. If wallet storage is not provisioned and
    /// the wallet is configured to fail open, the charge is allowed with a
    /// warning.
    pub async fn consume(&self, user: &str, cents: u64) -> Result<()> {
        match self.try_consume(user, cents).await {
            Err(LedgerError::Store(StoreError::Unavailable(namespace)))
                if self.config.flags.wallet_fail_open =>
            {
                log::warn!(
                    "Wallet storage '{}' unavailable, allowing charge of {} cents for {}",
                    namespace,
                    cents,
                    user
                );
                Ok(())
            }
            other => other,
        }
    }

    async fn try_consume(&self, user: &str, cents: u64) -> Result<()> {
        let key = Self::key(user);
        let required = to_delta(cents)?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.store.get(&key).await?;
            let balance = current.unwrap_or(0);
            if balance < required {
                return Err(LedgerError::InsufficientCredits {
                    balance,
                    required: cents,
                });
            }
            if self
                .store
                .compare_and_swap(&key, current, balance - required)
                .await?
            {
                return Ok(());
            }
        }

        Err(LedgerError::Store(StoreError::Backend(format!(
            "Wallet for {} too contended after {} attempts",
            user, MAX_CAS_ATTEMPTS
        ))))
    }
}
