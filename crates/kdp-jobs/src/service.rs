use crate::config::ServiceConfig;
use crate::error::Result;
use crate::job::{Job, JobKind, JobPriority, Requester};
use crate::queue::JobQueue;
use kdp_ledger::{Ledger, Metric};

/// Rough text tokens per page, for cost estimates
const TOKENS_PER_PAGE_ESTIMATE: u64 = 150;

/// A request to generate something
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub kind: JobKind,
    pub requester: Requester,
    pub priority: JobPriority,
    /// Falls back to the configured default
    pub max_retries: Option<u32>,
}

impl SubmitRequest {
    pub fn new(kind: JobKind, requester: Requester) -> Self {
        Self {
            kind,
            requester,
            priority: JobPriority::Normal,
            max_retries: None,
        }
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Admission control in front of the queue.
///
/// Geometry, budget and quota errors surface here, before any job exists.
#[derive(Clone)]
pub struct JobService {
    queue: JobQueue,
    ledger: Ledger,
    config: ServiceConfig,
}

impl JobService {
    pub fn new(queue: JobQueue, ledger: Ledger, config: ServiceConfig) -> Self {
        Self {
            queue,
            ledger,
            config,
        }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Estimated cost in cents of running `kind` once
    pub fn estimate_cost(&self, kind: &JobKind) -> u64 {
        let tokens = match kind {
            JobKind::PdfGeneration(_) => 0,
            _ => kind
                .book()
                .map(|b| b.page_count as u64 * TOKENS_PER_PAGE_ESTIMATE)
                .unwrap_or(0),
        };
        self.ledger
            .config()
            .prices
            .estimate(kind.max_images(), tokens)
    }

    pub async fn submit(&self, request: SubmitRequest) -> Result<Job> {
        let SubmitRequest {
            kind,
            requester,
            priority,
            max_retries,
        } = request;

        let spec = kind.print_spec()?;
        let estimate = self.estimate_cost(&kind);

        self.ledger
            .costs
            .assert_daily_cost_cap(&requester.user_id, estimate)
            .await?;
        // Quota counters never go back down, so charge the wallet first and
        // refund it if the quota rejects the book
        let charged = self.ledger.config().flags.enforce_wallet;
        if charged {
            self.ledger
                .wallet
                .consume(&requester.user_id, estimate)
                .await?;
        }
        let reserved = self
            .ledger
            .quota
            .reserve(
                &requester.org_id,
                Metric::Pages,
                spec.page_count() as u64,
                requester.tier,
            )
            .await;
        if let Err(e) = reserved {
            if charged {
                self.refund(&requester.user_id, estimate).await;
            }
            return Err(e.into());
        }

        let max_retries = max_retries.unwrap_or(self.config.worker.default_max_retries);
        self.queue
            .create_job(kind, requester, priority, max_retries)
            .await
    }

    async fn refund(&self, user: &str, cents: u64) {
        if let Err(e) = self.ledger.wallet.credit(user, cents).await {
            log::error!("Failed to refund {} cents to {}: {}", cents, user, e);
        }
    }
}
