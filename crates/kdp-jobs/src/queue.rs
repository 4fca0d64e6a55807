use crate::error::{JobError, Result};
use crate::job::{
    Job, JobId, JobKind, JobPriority, JobResult, JobStatus, JobStatusView, JobUpdate, Requester,
};
use crate::store::{JobStore, MemoryJobStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Priority queue of generation jobs over a [`JobStore`].
///
/// Cloning shares the store and the update channel.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    updates: broadcast::Sender<JobUpdate>,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { store, updates }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryJobStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Receive lifecycle events instead of polling [`status`](Self::status)
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    fn notify(&self, update: JobUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    pub async fn create_job(
        &self,
        kind: JobKind,
        requester: Requester,
        priority: JobPriority,
        max_retries: u32,
    ) -> Result<Job> {
        let job = self
            .store
            .insert(Job::new(kind, requester, priority, max_retries))
            .await?;

        log::info!(
            "Created {} job {} ({:?} priority)",
            job.kind.name(),
            job.id,
            job.priority
        );
        self.notify(JobUpdate::Created {
            id: job.id,
            kind: job.kind.name(),
        });
        Ok(job)
    }

    /// Claim the best pending job, marking it processing.
    ///
    /// Index entries whose job is no longer pending (cancelled, or already
    /// claimed) are dropped and the next entry is tried.
    pub async fn dequeue_next(&self) -> Result<Option<Job>> {
        while let Some(id) = self.store.pop_pending().await? {
            let claimed = match self
                .store
                .compare_and_swap_status(id, JobStatus::Pending, JobStatus::Processing)
                .await
            {
                Ok(claimed) => claimed,
                Err(JobError::NotFound(_)) => false,
                Err(e) => return Err(e),
            };
            if !claimed {
                log::debug!("Discarding stale queue entry for job {}", id);
                continue;
            }

            let job = self.store.get(id).await?.ok_or(JobError::NotFound(id))?;
            log::info!(
                "Dequeued {} job {} (attempt {})",
                job.kind.name(),
                id,
                job.retry_count + 1
            );
            self.notify(JobUpdate::Started { id });
            return Ok(Some(job));
        }
        Ok(None)
    }

    async fn load(&self, id: JobId) -> Result<Job> {
        self.store.get(id).await?.ok_or(JobError::NotFound(id))
    }

    fn expect_status(job: &Job, expected: JobStatus, to: JobStatus) -> Result<()> {
        if job.status == expected {
            Ok(())
        } else {
            Err(JobError::InvalidTransition {
                id: job.id,
                from: job.status,
                to,
            })
        }
    }

    /// Advisory progress; lower values than before are accepted
    pub async fn report_progress(&self, id: JobId, percent: u8) -> Result<()> {
        let mut job = self.load(id).await?;
        job.progress = percent.min(100);
        job.updated_at = Utc::now();
        self.store.update(&job).await?;

        self.notify(JobUpdate::Progress {
            id,
            progress: job.progress,
        });
        Ok(())
    }

    /// Record that the job's image quota is held
    pub async fn mark_images_reserved(&self, id: JobId) -> Result<()> {
        let mut job = self.load(id).await?;
        job.images_reserved = true;
        job.updated_at = Utc::now();
        self.store.update(&job).await
    }

    pub async fn complete_job(&self, id: JobId, result: JobResult) -> Result<Job> {
        let mut job = self.load(id).await?;
        Self::expect_status(&job, JobStatus::Processing, JobStatus::Completed)?;

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.result = Some(result);
        job.error = None;
        job.updated_at = Utc::now();
        self.store.update(&job).await?;

        log::info!("Completed {} job {}", job.kind.name(), id);
        self.notify(JobUpdate::Completed { id });
        Ok(job)
    }

    /// Retry the job at a lower score while retries remain, otherwise fail
    /// it for good with `error` recorded
    pub async fn fail_job(&self, id: JobId, error: impl Into<String>) -> Result<Job> {
        let error = error.into();
        let mut job = self.load(id).await?;
        Self::expect_status(&job, JobStatus::Processing, JobStatus::Pending)?;

        job.error = Some(error.clone());
        job.updated_at = Utc::now();

        if job.retry_count < job.max_retries {
            job.retry_count += 1;
            job.status = JobStatus::Pending;
            job.progress = 0;
            self.store.update(&job).await?;
            self.store
                .push_pending(job.id, job.score(), job.sequence)
                .await?;

            log::warn!(
                "Job {} failed, retry {}/{}: {}",
                id,
                job.retry_count,
                job.max_retries,
                error
            );
            self.notify(JobUpdate::Retrying {
                id,
                retry_count: job.retry_count,
                error,
            });
        } else {
            job.status = JobStatus::Failed;
            self.store.update(&job).await?;

            log::warn!("Job {} failed after {} retries: {}", id, job.retry_count, error);
            self.notify(JobUpdate::Failed { id, error });
        }
        Ok(job)
    }

    /// Fail without retrying, for errors another attempt cannot fix
    pub async fn abort_job(&self, id: JobId, error: impl Into<String>) -> Result<Job> {
        let error = error.into();
        let mut job = self.load(id).await?;
        Self::expect_status(&job, JobStatus::Processing, JobStatus::Failed)?;

        job.status = JobStatus::Failed;
        job.error = Some(error.clone());
        job.updated_at = Utc::now();
        self.store.update(&job).await?;

        log::warn!("Job {} aborted: {}", id, error);
        self.notify(JobUpdate::Failed { id, error });
        Ok(job)
    }

    /// Flip a pending job to cancelled. Its queue entry stays behind and is
    /// discarded by the next dequeue. Returns false if the job was not
    /// pending.
    pub async fn cancel_job(&self, id: JobId) -> Result<bool> {
        let cancelled = self
            .store
            .compare_and_swap_status(id, JobStatus::Pending, JobStatus::Cancelled)
            .await?;
        if cancelled {
            log::info!("Cancelled job {}", id);
            self.notify(JobUpdate::Cancelled { id });
        }
        Ok(cancelled)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        self.store.get(id).await
    }

    pub async fn status(&self, id: JobId) -> Result<JobStatusView> {
        Ok(self.load(id).await?.view())
    }
}
