//! Job persistence behind the primitives the queue needs

use crate::error::{JobError, Result};
use crate::job::{Job, JobId, JobStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tokio::sync::Mutex;

/// Durable job records plus a priority index of pending ids.
///
/// `pop_pending` and `compare_and_swap_status` must each be atomic: two
/// workers may never pop the same entry or both win the same transition.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job, assigning its sequence number, and index it as
    /// pending. Returns the stored record.
    async fn insert(&self, job: Job) -> Result<Job>;

    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Overwrite an existing record
    async fn update(&self, job: &Job) -> Result<()>;

    /// Move `id` from `expected` to `new`; false if the status differed
    async fn compare_and_swap_status(
        &self,
        id: JobId,
        expected: JobStatus,
        new: JobStatus,
    ) -> Result<bool>;

    /// Add an entry to the pending index
    async fn push_pending(&self, id: JobId, score: i64, sequence: u64) -> Result<()>;

    /// Remove and return the highest-scoring pending entry; ties go to the
    /// lowest sequence
    async fn pop_pending(&self) -> Result<Option<JobId>>;

    /// Entries in the pending index, stale ones included
    async fn pending_len(&self) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEntry {
    score: i64,
    sequence: u64,
    id: JobId,
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher score first, then older sequence first
        self.score
            .cmp(&other.score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<JobId, Job>,
    pending: BinaryHeap<PendingEntry>,
    next_sequence: u64,
}

/// In-process [`JobStore`]; one mutex covers records and index together
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored job, oldest first
    pub async fn all(&self) -> Vec<Job> {
        let state = self.inner.lock().await;
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.sequence);
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, mut job: Job) -> Result<Job> {
        let mut state = self.inner.lock().await;
        if state.jobs.contains_key(&job.id) {
            return Err(JobError::Store(format!("Job {} already exists", job.id)));
        }

        state.next_sequence += 1;
        job.sequence = state.next_sequence;
        state.pending.push(PendingEntry {
            score: job.score(),
            sequence: job.sequence,
            id: job.id,
        });
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut state = self.inner.lock().await;
        match state.jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(JobError::NotFound(job.id)),
        }
    }

    async fn compare_and_swap_status(
        &self,
        id: JobId,
        expected: JobStatus,
        new: JobStatus,
    ) -> Result<bool> {
        let mut state = self.inner.lock().await;
        let job = state.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        if job.status != expected {
            return Ok(false);
        }
        job.status = new;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn push_pending(&self, id: JobId, score: i64, sequence: u64) -> Result<()> {
        self.inner.lock().await.pending.push(PendingEntry {
            score,
            sequence,
            id,
        });
        Ok(())
    }

    async fn pop_pending(&self) -> Result<Option<JobId>> {
        Ok(self.inner.lock().await.pending.pop().map(|e| e.id))
    }

    async fn pending_len(&self) -> Result<usize> {
        Ok(self.inner.lock().await.pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(score: i64, sequence: u64) -> PendingEntry {
        PendingEntry {
            score,
            sequence,
            id: Uuid::new_v4(),
        }
    }

    #[test]
    fn higher_score_wins() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(0, 1));
        heap.push(entry(1_000_000, 2));
        heap.push(entry(-1_000_000, 3));
        let order: Vec<i64> = std::iter::from_fn(|| heap.pop().map(|e| e.score)).collect();
        assert_eq!(order, vec![1_000_000, 0, -1_000_000]);
    }

    #[test]
    fn older_sequence_wins_ties() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(0, 3));
        heap.push(entry(0, 1));
        heap.push(entry(0, 2));
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.sequence)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn retried_job_sinks_below_fresh_work() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(-1, 1));
        heap.push(entry(0, 5));
        assert_eq!(heap.pop().map(|e| e.sequence), Some(5));
    }
}
