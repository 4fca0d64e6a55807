//! Per-kind generation pipelines: quota, content, images, assembly, storage.
//!
//! Steps run strictly in order and report progress at fixed milestones.

use crate::config::WorkerConfig;
use crate::error::{JobError, Result};
use crate::generator::{ContentGenerator, ImageGenerator, ImageStyle, generate_for_mode};
use crate::job::{BookRequest, Job, JobFiles, JobKind, JobResult};
use crate::queue::JobQueue;
use crate::storage::FileStorage;
use kdp_assembler::{
    AssembleError, AssemblerOptions, ContentMap, PageContent, assemble_cover_front,
    assemble_cover_wrap, assemble_interior, inspect_pdf,
};
use kdp_layout::{
    BookMode, BookPlan, PrintSpec, ValidationError, build_plan, compose_book, content_slots,
    normalize_page_count,
};
use kdp_ledger::{Ledger, Metric};
use std::future::Future;
use std::sync::Arc;

pub const PROGRESS_PLANNED: u8 = 10;
pub const PROGRESS_GENERATED: u8 = 60;
pub const PROGRESS_ASSEMBLED: u8 = 90;

/// Collaborators shared by every pipeline run
#[derive(Clone)]
pub struct PipelineContext {
    pub ledger: Ledger,
    pub content: Arc<dyn ContentGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub storage: Arc<dyn FileStorage>,
    pub config: WorkerConfig,
}

async fn with_timeout<T>(
    config: &WorkerConfig,
    operation: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(config.generation_timeout(), fut).await {
        Ok(result) => result,
        Err(_) => Err(JobError::Timeout {
            operation: operation.to_string(),
            timeout_ms: config.generation_timeout_ms,
        }),
    }
}

/// Run `job` to a result. The caller owns the job's status transitions.
pub async fn run_pipeline(
    ctx: &PipelineContext,
    queue: &JobQueue,
    job: &Job,
) -> Result<JobResult> {
    match &job.kind {
        JobKind::KdpGeneration(p) => generate_book(ctx, queue, job, &p.book, p.mode).await,
        JobKind::StoryGeneration(book) => {
            generate_book(ctx, queue, job, book, BookMode::Story).await
        }
        JobKind::ColoringGeneration(book) => {
            generate_book(ctx, queue, job, book, BookMode::Coloring).await
        }
        JobKind::ActivityGeneration(book) => {
            generate_book(ctx, queue, job, book, BookMode::Activity).await
        }
        JobKind::PdfGeneration(p) => {
            queue.report_progress(job.id, PROGRESS_PLANNED).await?;
            queue.report_progress(job.id, PROGRESS_GENERATED).await?;
            let result =
                assemble_and_store(ctx, queue, job, p.plan.clone(), ContentMap::new()).await?;
            record_usage(ctx, job, &result, 0).await;
            Ok(result)
        }
    }
}

async fn generate_book(
    ctx: &PipelineContext,
    queue: &JobQueue,
    job: &Job,
    book: &BookRequest,
    mode: BookMode,
) -> Result<JobResult> {
    let spec = book.print_spec()?;
    let requester = &job.requester;

    // Budget before any external call. Images are held once per job; each
    // retry only costs a regeneration.
    if !job.images_reserved {
        ctx.ledger
            .quota
            .reserve(
                &requester.org_id,
                Metric::Images,
                job.kind.max_images(),
                requester.tier,
            )
            .await?;
        queue.mark_images_reserved(job.id).await?;
    }
    if job.retry_count > 0 {
        ctx.ledger
            .quota
            .reserve(&requester.org_id, Metric::Regens, 1, requester.tier)
            .await?;
    }

    let plan = plan_book(ctx, spec, book, mode).await?;
    queue.report_progress(job.id, PROGRESS_PLANNED).await?;

    let (content, generated_images) = generate_images(ctx, &plan, mode, book).await?;
    queue.report_progress(job.id, PROGRESS_GENERATED).await?;

    let result = assemble_and_store(ctx, queue, job, plan, content).await?;
    record_usage(ctx, job, &result, generated_images).await;
    Ok(result)
}

/// Generate content until it forms a valid plan, up to the configured
/// number of fresh attempts
async fn plan_book(
    ctx: &PipelineContext,
    spec: PrintSpec,
    book: &BookRequest,
    mode: BookMode,
) -> Result<BookPlan> {
    let slots = content_slots(spec.page_count());
    let mut last_error: Option<ValidationError> = None;

    for attempt in 1..=ctx.config.max_plan_attempts {
        let generated = with_timeout(
            &ctx.config,
            "content generation",
            generate_for_mode(ctx.content.as_ref(), mode, &book.theme, slots, book.age_range),
        )
        .await?;

        if generated.pages.len() != slots {
            log::debug!(
                "Generator returned {} pages for {} slots, normalizing",
                generated.pages.len(),
                slots
            );
        }
        let content =
            normalize_page_count(generated.pages, slots, &book.theme, mode.filler_kind());
        let pages = compose_book(
            &generated.title,
            &generated.cover_prompt,
            &generated.blurb,
            content,
        );

        match build_plan(spec, book.age_range, mode, pages) {
            Ok(plan) => return Ok(plan),
            Err(e) => {
                log::warn!(
                    "Plan attempt {}/{} rejected: {}",
                    attempt,
                    ctx.config.max_plan_attempts,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e.into()),
        None => Err(JobError::Config("No plan attempts configured".to_string())),
    }
}

/// Request artwork for every page that wants it. Individual failures leave
/// the page without art; losing all of them fails the attempt.
async fn generate_images(
    ctx: &PipelineContext,
    plan: &BookPlan,
    mode: BookMode,
    book: &BookRequest,
) -> Result<(ContentMap, u64)> {
    let mut content = ContentMap::new();
    let mut wanted = 0u64;
    let mut generated = 0u64;

    for page in plan.pages().iter().filter(|p| p.kind.wants_image()) {
        wanted += 1;
        let prompt = page
            .payload
            .prompt
            .clone()
            .or_else(|| page.payload.title.clone())
            .unwrap_or_else(|| book.theme.clone());
        let style = ImageStyle::for_page(mode, book.age_range, page.kind);

        let outcome = with_timeout(
            &ctx.config,
            "image generation",
            ctx.images.generate_image(&prompt, &style),
        )
        .await;

        match outcome {
            Ok(Some(bytes)) => {
                generated += 1;
                content.insert(page.index, PageContent::default().with_image(bytes));
            }
            Ok(None) => log::warn!("No image returned for page {}", page.index),
            Err(e) => log::warn!("Image for page {} failed: {}", page.index, e),
        }
    }

    if wanted > 0 && generated == 0 {
        return Err(JobError::Generation(format!(
            "All {} image requests failed",
            wanted
        )));
    }
    Ok((content, generated))
}

async fn assemble_and_store(
    ctx: &PipelineContext,
    queue: &JobQueue,
    job: &Job,
    plan: BookPlan,
    content: ContentMap,
) -> Result<JobResult> {
    let options = AssemblerOptions::titled(plan.title());

    let interior = assemble_interior(&plan, &content, &options).await?;
    let summary = inspect_pdf(&interior)?;
    if summary.page_count != plan.pages().len() {
        return Err(AssembleError::Pdf(format!(
            "Interior has {} pages, plan has {}",
            summary.page_count,
            plan.pages().len()
        ))
        .into());
    }

    let covers = if job.kind.includes_covers() {
        let front = assemble_cover_front(&plan, &content, &options).await?;
        let wrap = assemble_cover_wrap(&plan, &content, &options).await?;
        Some((front, wrap))
    } else {
        None
    };
    queue.report_progress(job.id, PROGRESS_ASSEMBLED).await?;

    let prefix = job.id.to_string();
    let interior_url = ctx
        .storage
        .put(&format!("{}/interior.pdf", prefix), interior)
        .await?;
    let (cover_front, cover_wrap) = match covers {
        Some((front, wrap)) => (
            Some(
                ctx.storage
                    .put(&format!("{}/cover-front.pdf", prefix), front)
                    .await?,
            ),
            Some(
                ctx.storage
                    .put(&format!("{}/cover-wrap.pdf", prefix), wrap)
                    .await?,
            ),
        ),
        None => (None, None),
    };

    Ok(JobResult {
        files: JobFiles {
            interior: interior_url,
            cover_front,
            cover_wrap,
        },
        page_count: plan.print_spec().page_count(),
        spine_width: plan.geometry().spine_width,
        plan,
    })
}

/// Commit actual spend and usage. The book is already built, so ledger
/// failures here are logged rather than failing the job.
async fn record_usage(ctx: &PipelineContext, job: &Job, result: &JobResult, images: u64) {
    let requester = &job.requester;
    let cost = ctx.ledger.config().prices.estimate(images, 0);

    if let Err(e) = ctx.ledger.costs.record_cost(&requester.user_id, cost).await {
        log::warn!("Failed to record cost for job {}: {}", job.id, e);
    }

    let events = [
        (Metric::Pages, result.page_count as u64),
        (Metric::Images, images),
    ];
    for (metric, amount) in events {
        if amount == 0 {
            continue;
        }
        if let Err(e) = ctx
            .ledger
            .usage
            .record_usage_event(&requester.org_id, metric, amount)
            .await
        {
            log::warn!("Failed to record {} usage for job {}: {}", metric, job.id, e);
        }
    }
}
