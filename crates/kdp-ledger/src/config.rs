use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quota counters survive this long so trailing reads still work after a
/// new period starts
pub const QUOTA_RETENTION_DAYS: i64 = 45;

/// Usage events kept per (org, metric, period)
pub const USAGE_HISTORY_CAPACITY: usize = 1000;

/// Metered quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Pages,
    Images,
    Regens,
    Tokens,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Pages, Metric::Images, Metric::Regens, Metric::Tokens];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Pages => "pages",
            Metric::Images => "images",
            Metric::Regens => "regens",
            Metric::Tokens => "tokens",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription tier an organization is billed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Business,
}

impl FromStr for PlanTier {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "starter" => Ok(PlanTier::Starter),
            "pro" => Ok(PlanTier::Pro),
            "business" => Ok(PlanTier::Business),
            other => Err(LedgerError::Config(format!("Unknown plan tier: {}", other))),
        }
    }
}

/// Unit prices in cents, used to estimate a job's cost before admission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prices {
    pub image_cents: u64,
    pub per_1k_tokens_cents: u64,
    pub assembly_cents: u64,
}

impl Default for Prices {
    fn default() -> Self {
        Self {
            image_cents: 4,
            per_1k_tokens_cents: 1,
            assembly_cents: 1,
        }
    }
}

impl Prices {
    /// Estimated cost of one generation with `images` images and `tokens`
    /// text tokens
    pub fn estimate(&self, images: u64, tokens: u64) -> u64 {
        images
            .saturating_mul(self.image_cents)
            .saturating_add(tokens.div_ceil(1000).saturating_mul(self.per_1k_tokens_cents))
            .saturating_add(self.assembly_cents)
    }
}

/// Monthly limits for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    pub pages: u64,
    pub images: u64,
    pub regens: u64,
    pub tokens: u64,
}

impl TierLimits {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Pages => self.pages,
            Metric::Images => self.images,
            Metric::Regens => self.regens,
            Metric::Tokens => self.tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotaLimits {
    pub free: TierLimits,
    pub starter: TierLimits,
    pub pro: TierLimits,
    pub business: TierLimits,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free: TierLimits {
                pages: 120,
                images: 120,
                regens: 10,
                tokens: 200_000,
            },
            starter: TierLimits {
                pages: 1_000,
                images: 1_000,
                regens: 50,
                tokens: 2_000_000,
            },
            pro: TierLimits {
                pages: 5_000,
                images: 5_000,
                regens: 200,
                tokens: 10_000_000,
            },
            business: TierLimits {
                pages: 20_000,
                images: 20_000,
                regens: 1_000,
                tokens: 50_000_000,
            },
        }
    }
}

impl QuotaLimits {
    pub fn for_tier(&self, tier: PlanTier) -> &TierLimits {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Starter => &self.starter,
            PlanTier::Pro => &self.pro,
            PlanTier::Business => &self.business,
        }
    }

    pub fn limit(&self, tier: PlanTier, metric: Metric) -> u64 {
        self.for_tier(tier).get(metric)
    }
}

/// Rolling 24h spending caps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostCaps {
    pub user_daily_cents: u64,
    pub global_daily_cents: u64,
    /// Fraction of a cap at which a warning is logged
    pub warn_ratio: f64,
}

impl Default for CostCaps {
    fn default() -> Self {
        Self {
            user_daily_cents: 200,
            global_daily_cents: 4_000,
            warn_ratio: 0.8,
        }
    }
}

/// Degradation switches for optional ledgers.
///
/// Budget caps have no switch: they always fail closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerFlags {
    pub wallet_fail_open: bool,
    pub usage_history_fail_open: bool,
    /// Charge the prepaid wallet when jobs are admitted
    pub enforce_wallet: bool,
}

impl Default for LedgerFlags {
    fn default() -> Self {
        Self {
            wallet_fail_open: true,
            usage_history_fail_open: true,
            enforce_wallet: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerConfig {
    pub prices: Prices,
    pub limits: QuotaLimits,
    pub caps: CostCaps,
    pub flags: LedgerFlags,
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.caps.user_daily_cents == 0 || self.caps.global_daily_cents == 0 {
            return Err(LedgerError::Config(
                "Daily cost caps must be greater than zero".to_string(),
            ));
        }
        if self.caps.user_daily_cents > self.caps.global_daily_cents {
            return Err(LedgerError::Config(format!(
                "Per-user cap ({}) exceeds global cap ({})",
                self.caps.user_daily_cents, self.caps.global_daily_cents
            )));
        }
        if !(self.caps.warn_ratio > 0.0 && self.caps.warn_ratio <= 1.0) {
            return Err(LedgerError::Config(format!(
                "Warning ratio must be in (0, 1], got {}",
                self.caps.warn_ratio
            )));
        }
        Ok(())
    }
}
