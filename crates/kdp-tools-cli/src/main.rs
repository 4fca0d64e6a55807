mod logger;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use kdp_jobs::{
    BookRequest, JobKind, JobQueue, JobService, JobStatus, KdpGenerationPayload,
    LocalFileStorage, PipelineContext, PlaceholderContentGenerator, PlaceholderImageGenerator,
    Requester, RunOutcome, ServiceConfig, SubmitRequest, Worker,
};
use kdp_layout::{
    AgeRange, BookMode, BookPlan, PaperTint, PrintSpec, TrimSize, build_plan, calculate_statistics,
    content_box, cover_front_size, cover_wrap_size, load_pages_from_csv, page_size,
};
use kdp_ledger::{Ledger, PlanTier};
use logger::CliLogger;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kdpt", about = "KDP book tools CLI", version)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print trim, margins, spine and cover dimensions for a book
    Geometry {
        /// Page count (even, 24 to 828)
        #[arg(short, long)]
        pages: u32,

        /// Paper stock
        #[arg(long, default_value = "white", value_enum)]
        paper: PaperArg,

        /// Trim size, e.g. 8.5x11 or 6x9
        #[arg(long, default_value = "8.5x11")]
        trim: String,

        /// Add interior bleed
        #[arg(long)]
        bleed: bool,
    },

    /// Validate a plan file (JSON plan, or CSV page list) and show statistics
    ValidatePlan {
        /// Plan JSON or CSV page list (columns: kind, title, prompt, text)
        input: PathBuf,

        /// Page count for CSV input; defaults to the number of rows
        #[arg(short, long)]
        pages: Option<u32>,

        /// Book mode for CSV input
        #[arg(long, default_value = "coloring", value_enum)]
        mode: ModeArg,

        /// Reader age for CSV input
        #[arg(long, default_value = "5-7", value_enum)]
        age: AgeArg,

        /// Paper stock for CSV input
        #[arg(long, default_value = "white", value_enum)]
        paper: PaperArg,

        /// Trim size for CSV input
        #[arg(long, default_value = "8.5x11")]
        trim: String,

        /// Add interior bleed for CSV input
        #[arg(long)]
        bleed: bool,
    },

    /// Assemble interior and cover PDFs from a validated plan JSON
    Assemble {
        /// Plan JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate a complete book offline with placeholder content and art
    Generate {
        /// Theme or story prompt
        #[arg(short, long)]
        theme: String,

        /// Page count (even, 24 to 828)
        #[arg(short, long, default_value = "24")]
        pages: u32,

        #[arg(long, default_value = "coloring", value_enum)]
        mode: ModeArg,

        #[arg(long, default_value = "5-7", value_enum)]
        age: AgeArg,

        #[arg(long, default_value = "white", value_enum)]
        paper: PaperArg,

        #[arg(long, default_value = "8.5x11")]
        trim: String,

        #[arg(long)]
        bleed: bool,

        /// Plan tier whose quotas apply
        #[arg(long, default_value = "free", value_enum)]
        tier: TierArg,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Service configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    White,
    Cream,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Coloring,
    Story,
    Activity,
}

#[derive(Clone, Copy, ValueEnum)]
enum AgeArg {
    #[value(name = "2-4")]
    Toddler,
    #[value(name = "5-7")]
    EarlyReader,
    #[value(name = "8-12")]
    MiddleGrade,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Free,
    Starter,
    Pro,
    Business,
}

impl From<PaperArg> for PaperTint {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::White => Self::White,
            PaperArg::Cream => Self::Cream,
        }
    }
}

impl From<ModeArg> for BookMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Coloring => Self::Coloring,
            ModeArg::Story => Self::Story,
            ModeArg::Activity => Self::Activity,
        }
    }
}

impl From<AgeArg> for AgeRange {
    fn from(arg: AgeArg) -> Self {
        match arg {
            AgeArg::Toddler => Self::Toddler,
            AgeArg::EarlyReader => Self::EarlyReader,
            AgeArg::MiddleGrade => Self::MiddleGrade,
        }
    }
}

impl From<TierArg> for PlanTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Free => Self::Free,
            TierArg::Starter => Self::Starter,
            TierArg::Pro => Self::Pro,
            TierArg::Business => Self::Business,
        }
    }
}

fn parse_trim(trim: &str) -> Result<TrimSize> {
    trim.parse::<TrimSize>().map_err(anyhow::Error::msg)
}

fn print_geometry(spec: &PrintSpec) {
    let (page_w, page_h) = page_size(spec);
    let margins = spec.margins();
    let wrap = cover_wrap_size(spec);
    let (front_w, front_h) = cover_front_size(spec);
    let recto = content_box(spec, 0);

    println!("Print Geometry:");
    println!(
        "  Trim: {}\" x {}\" ({} pages, {:?} paper)",
        spec.trim_width_in(),
        spec.trim_height_in(),
        spec.page_count(),
        spec.paper()
    );
    println!("  Interior page: {:.3}\" x {:.3}\"", page_w, page_h);
    println!(
        "  Margins: top {}\", bottom {}\", outer {}\", inner {}\"",
        margins.top_in, margins.bottom_in, margins.outer_in, margins.inner_in
    );
    println!(
        "  Content box: {:.3}\" x {:.3}\"",
        recto.width_in, recto.height_in
    );
    println!("  Spine width: {:.4}\"", wrap.spine_width_in);
    println!(
        "  Cover wrap: {:.4}\" x {:.3}\" (spine text {})",
        wrap.width_in,
        wrap.height_in,
        if wrap.allows_spine_text() {
            "allowed"
        } else {
            "not allowed"
        }
    );
    println!("  Front cover: {:.3}\" x {:.3}\"", front_w, front_h);
}

fn print_statistics(plan: &BookPlan) {
    let stats = calculate_statistics(plan);
    println!("Plan Statistics:");
    println!("  Title: {}", plan.title());
    println!("  Mode: {}", plan.mode());
    println!("  Pages: {} ({} content)", stats.page_count, stats.content_pages);
    println!("  Leaves: {}", stats.leaves);
    for (kind, count) in &stats.pages_by_kind {
        println!("    {}: {}", kind, count);
    }
    println!("  Pages with artwork: {}", stats.image_pages);
    println!("  Spine width: {:.4}\"", stats.spine_width_in);
    println!(
        "  Cover wrap: {:.4}\" x {:.3}\"",
        stats.cover_size_in.0, stats.cover_size_in.1
    );
}

async fn load_plan(
    input: &Path,
    pages: Option<u32>,
    spec_for: impl FnOnce(u32) -> Result<PrintSpec>,
    age: AgeRange,
    mode: BookMode,
) -> Result<BookPlan> {
    let is_csv = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return BookPlan::load(input)
            .await
            .with_context(|| format!("Failed to load plan {}", input.display()));
    }

    let planned = load_pages_from_csv(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let page_count = match pages {
        Some(n) => n,
        None => u32::try_from(planned.len()).context("Too many rows")?,
    };
    let spec = spec_for(page_count)?;
    Ok(build_plan(spec, age, mode, planned)?)
}

async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::from_verbosity(cli.verbose).init()?;

    match cli.command {
        Commands::Geometry {
            pages,
            paper,
            trim,
            bleed,
        } => {
            let spec = PrintSpec::new(parse_trim(&trim)?, pages, paper.into(), bleed)?;
            print_geometry(&spec);
        }

        Commands::ValidatePlan {
            input,
            pages,
            mode,
            age,
            paper,
            trim,
            bleed,
        } => {
            let trim = parse_trim(&trim)?;
            let plan = load_plan(
                &input,
                pages,
                |n| Ok(PrintSpec::new(trim, n, paper.into(), bleed)?),
                age.into(),
                mode.into(),
            )
            .await?;
            println!("Plan is valid");
            print_statistics(&plan);
        }

        Commands::Assemble { input, output } => {
            let plan = BookPlan::load(&input)
                .await
                .with_context(|| format!("Failed to load plan {}", input.display()))?;
            tokio::fs::create_dir_all(&output).await?;

            let content = kdp_assembler::ContentMap::new();
            let options = kdp_assembler::AssemblerOptions::titled(plan.title());

            let interior = kdp_assembler::assemble_interior(&plan, &content, &options).await?;
            let front = kdp_assembler::assemble_cover_front(&plan, &content, &options).await?;
            let wrap = kdp_assembler::assemble_cover_wrap(&plan, &content, &options).await?;

            for (name, bytes) in [
                ("interior.pdf", &interior),
                ("cover-front.pdf", &front),
                ("cover-wrap.pdf", &wrap),
            ] {
                let path = write_file(&output, name, bytes).await?;
                println!("Assembled → {}", path.display());
            }
        }

        Commands::Generate {
            theme,
            pages,
            mode,
            age,
            paper,
            trim,
            bleed,
            tier,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => ServiceConfig::load(&path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ServiceConfig::default(),
            };

            let ledger = Ledger::in_memory(config.ledger.clone())?;
            let queue = JobQueue::in_memory();
            let service = JobService::new(queue.clone(), ledger.clone(), config.clone());

            let book = BookRequest {
                theme,
                page_count: pages,
                paper: paper.into(),
                trim: parse_trim(&trim)?,
                include_bleed: bleed,
                age_range: age.into(),
            };
            let kind = JobKind::KdpGeneration(KdpGenerationPayload {
                book,
                mode: mode.into(),
            });
            let requester = Requester::new("local", "local", tier.into());
            let job = service.submit(SubmitRequest::new(kind, requester)).await?;
            println!("Submitted job {}", job.id);

            tokio::fs::create_dir_all(&output).await?;
            let ctx = PipelineContext {
                ledger,
                content: Arc::new(PlaceholderContentGenerator),
                images: Arc::new(PlaceholderImageGenerator::default()),
                storage: Arc::new(LocalFileStorage::new(&output)),
                config: config.worker,
            };
            let worker = Worker::new(queue.clone(), ctx);

            loop {
                match worker.run_once().await? {
                    RunOutcome::Retrying(id) => log::info!("Retrying job {}", id),
                    RunOutcome::Idle => bail!("Job {} left the queue unexpectedly", job.id),
                    RunOutcome::Completed(_) | RunOutcome::Failed(_) => break,
                }
            }

            let view = queue.status(job.id).await?;
            match (view.status, view.result) {
                (JobStatus::Completed, Some(result)) => {
                    println!("Generated {} pages", result.page_count);
                    println!("  Spine width: {:.4}\"", result.spine_width);
                    println!("  Interior: {}", result.files.interior);
                    if let Some(front) = result.files.cover_front {
                        println!("  Front cover: {}", front);
                    }
                    if let Some(wrap) = result.files.cover_wrap {
                        println!("  Cover wrap: {}", wrap);
                    }
                }
                (status, _) => bail!(
                    "Job {} {}: {}",
                    job.id,
                    status,
                    view.error.unwrap_or_default()
                ),
            }
        }
    }

    Ok(())
}
