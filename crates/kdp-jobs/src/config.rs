use crate::error::{JobError, Result};
use kdp_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker loop and pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    /// Sleep when the queue is empty
    pub idle_backoff_ms: u64,
    /// Sleep after an unexpected loop-level error
    pub error_backoff_ms: u64,
    /// Per-call limit on content and image generation
    pub generation_timeout_ms: u64,
    /// Fresh plan generations before a job attempt gives up
    pub max_plan_attempts: u32,
    pub default_max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 5_000,
            error_backoff_ms: 10_000,
            generation_timeout_ms: 120_000,
            max_plan_attempts: 3,
            default_max_retries: 3,
        }
    }
}

impl WorkerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation_timeout_ms == 0 {
            return Err(JobError::Config(
                "Generation timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_plan_attempts == 0 {
            return Err(JobError::Config(
                "At least one plan attempt is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a job service needs, loadable from one JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub ledger: LedgerConfig,
    pub worker: WorkerConfig,
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| JobError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| JobError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;
        self.worker.validate()
    }
}
