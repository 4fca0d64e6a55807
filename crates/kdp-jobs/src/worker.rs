use crate::config::WorkerConfig;
use crate::error::Result;
use crate::job::{JobId, JobResult, JobStatus};
use crate::pipeline::{PipelineContext, run_pipeline};
use crate::queue::JobQueue;
use tokio::sync::watch;
use tokio::task::JoinError;

/// What one turn of the worker loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Queue was empty
    Idle,
    Completed(JobId),
    /// Failed and re-queued
    Retrying(JobId),
    Failed(JobId),
}

/// Single consumer of a [`JobQueue`]. Several workers may share a queue.
pub struct Worker {
    queue: JobQueue,
    ctx: PipelineContext,
}

impl Worker {
    pub fn new(queue: JobQueue, ctx: PipelineContext) -> Self {
        Self { queue, ctx }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.ctx.config
    }

    /// Claim and run at most one job.
    ///
    /// Job failures are recorded on the job and reported as an outcome; an
    /// `Err` means the queue itself misbehaved.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let Some(job) = self.queue.dequeue_next().await? else {
            return Ok(RunOutcome::Idle);
        };
        let id = job.id;

        // A panicking pipeline must not take the worker down with it
        let ctx = self.ctx.clone();
        let queue = self.queue.clone();
        let handle = tokio::spawn(async move { run_pipeline(&ctx, &queue, &job).await });

        self.record_outcome(id, handle.await)
            .await
            .inspect_err(|e| {
                log::error!("Job {} stranded in processing, outcome not recorded: {}", id, e)
            })
    }

    async fn record_outcome(
        &self,
        id: JobId,
        joined: std::result::Result<Result<JobResult>, JoinError>,
    ) -> Result<RunOutcome> {
        let outcome = match joined {
            Ok(Ok(result)) => {
                self.queue.complete_job(id, result).await?;
                RunOutcome::Completed(id)
            }
            Ok(Err(e)) if e.is_retryable() => {
                let job = self.queue.fail_job(id, e.to_string()).await?;
                if job.status == JobStatus::Pending {
                    RunOutcome::Retrying(id)
                } else {
                    RunOutcome::Failed(id)
                }
            }
            Ok(Err(e)) => {
                self.queue.abort_job(id, e.to_string()).await?;
                RunOutcome::Failed(id)
            }
            Err(join_error) => {
                log::error!("Job {} crashed: {}", id, join_error);
                let job = self
                    .queue
                    .fail_job(id, format!("Job crashed: {}", join_error))
                    .await?;
                if job.status == JobStatus::Pending {
                    RunOutcome::Retrying(id)
                } else {
                    RunOutcome::Failed(id)
                }
            }
        };
        Ok(outcome)
    }

    /// Process jobs until `shutdown` turns true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        log::info!("Worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.run_once().await {
                Ok(RunOutcome::Idle) => Some(self.ctx.config.idle_backoff()),
                Ok(_) => None,
                Err(e) => {
                    log::error!(
                        "Worker loop error, backing off {}ms: {}",
                        self.ctx.config.error_backoff_ms,
                        e
                    );
                    Some(self.ctx.config.error_backoff())
                }
            };

            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        log::info!("Worker stopped");
    }
}
