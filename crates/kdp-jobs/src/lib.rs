//! Generation jobs: admission, queueing, and the worker that runs them

mod config;
mod error;
mod generator;
mod job;
mod pipeline;
mod queue;
mod service;
mod storage;
mod store;
mod worker;

pub use config::{ServiceConfig, WorkerConfig};
pub use error::{JobError, Result};
pub use generator::{
    ContentGenerator, GeneratedBook, ImageGenerator, ImageStyle, PlaceholderContentGenerator,
    PlaceholderImageGenerator, generate_for_mode,
};
pub use job::*;
pub use pipeline::{
    PROGRESS_ASSEMBLED, PROGRESS_GENERATED, PROGRESS_PLANNED, PipelineContext, run_pipeline,
};
pub use queue::JobQueue;
pub use service::{JobService, SubmitRequest};
pub use storage::{FileStorage, LocalFileStorage, MemoryFileStorage};
pub use store::{JobStore, MemoryJobStore};
pub use worker::{RunOutcome, Worker};
