use crate::job::{JobId, JobStatus};
use kdp_assembler::AssembleError;
use kdp_layout::{GeometryError, LayoutError, ValidationError};
use kdp_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Assembly error: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Job store error: {0}")]
    Store(String),

    #[error("File storage error: {0}")]
    Storage(String),

    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GeometryError> for JobError {
    fn from(e: GeometryError) -> Self {
        JobError::Layout(LayoutError::Geometry(e))
    }
}

impl From<ValidationError> for JobError {
    fn from(e: ValidationError) -> Self {
        JobError::Layout(LayoutError::Validation(e))
    }
}

impl JobError {
    /// Whether another attempt could succeed without outside intervention.
    ///
    /// Bad geometry and budget errors are final. A plan that still fails
    /// validation after every regeneration counts as a generation failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Layout(LayoutError::Validation(_)) => true,
            JobError::Layout(_) => false,
            JobError::Ledger(LedgerError::Store(_)) => true,
            JobError::Ledger(_) => false,
            JobError::Assemble(_)
            | JobError::Generation(_)
            | JobError::Timeout { .. }
            | JobError::Store(_)
            | JobError::Storage(_)
            | JobError::TaskJoin(_)
            | JobError::Io(_) => true,
            JobError::NotFound(_) | JobError::InvalidTransition { .. } | JobError::Config(_) => {
                false
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
