use crate::config::Metric;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Quota exceeded for {metric}: {used} of {limit} used, {requested} requested")]
    QuotaExceeded {
        metric: Metric,
        used: u64,
        limit: u64,
        requested: u64,
    },

    #[error(
        "Daily {scope} cost cap exceeded: {committed} committed + {estimate} estimated > {cap} cents"
    )]
    DailyCapExceeded {
        scope: CapScope,
        committed: u64,
        estimate: u64,
        cap: u64,
    },

    #[error("Insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: i64, required: u64 },

    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Which daily cap a cost check ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapScope {
    User,
    Global,
}

impl fmt::Display for CapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapScope::User => write!(f, "per-user"),
            CapScope::Global => write!(f, "global"),
        }
    }
}

pub(crate) fn to_delta(amount: u64) -> Result<i64> {
    i64::try_from(amount).map_err(|_| LedgerError::Config(format!("amount {} is too large", amount)))
}
