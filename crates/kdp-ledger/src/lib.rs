//! Quota, budget, wallet and usage accounting for book generation
//!
//! All state lives behind the narrow [`LedgerStore`] trait so the same logic
//! runs against the in-memory store in tests and a shared backend in
//! production.

mod budget;
mod config;
mod error;
mod quota;
mod store;
mod usage;
mod wallet;

pub use budget::CostGuard;
pub use config::*;
pub use error::*;
pub use quota::{QuotaLedger, Reservation, period_of};
pub use store::{LedgerStore, MemoryLedgerStore, StoreError, namespace_of};
pub use usage::{UsageEvent, UsageHistory};
pub use wallet::Wallet;

use std::sync::Arc;

/// The four ledgers sharing one store and one configuration
#[derive(Clone)]
pub struct Ledger {
    pub quota: QuotaLedger,
    pub costs: CostGuard,
    pub wallet: Wallet,
    pub usage: UsageHistory,
    config: Arc<LedgerConfig>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            quota: QuotaLedger::new(store.clone(), config.clone()),
            costs: CostGuard::new(store.clone(), config.clone()),
            wallet: Wallet::new(store.clone(), config.clone()),
            usage: UsageHistory::new(store, config.clone()),
            config,
        })
    }

    /// Ledger over a fresh [`MemoryLedgerStore`]
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryLedgerStore::new()), config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}
