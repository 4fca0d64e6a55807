//! Job records and their typed payloads

use chrono::{DateTime, Utc};
use kdp_layout::{
    AgeRange, BookMode, BookPlan, GeometryError, PaperTint, PrintSpec, TrimSize, content_slots,
    page_count_from_number,
};
use kdp_ledger::PlanTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Set from outside the queue; the next dequeue discards the job
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl JobPriority {
    /// Offset added to a job's queue score
    pub fn offset(self) -> i64 {
        match self {
            JobPriority::Low => -1_000_000,
            JobPriority::Normal => 0,
            JobPriority::High => 1_000_000,
        }
    }
}

/// Who asked for the job and which limits apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub user_id: String,
    pub org_id: String,
    #[serde(default)]
    pub tier: PlanTier,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>, tier: PlanTier) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
            tier,
        }
    }
}

/// Physical shape and subject of a book to generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BookRequestRecord", into = "BookRequestRecord")]
pub struct BookRequest {
    /// Theme or story prompt
    pub theme: String,
    pub page_count: u32,
    pub paper: PaperTint,
    pub trim: TrimSize,
    pub include_bleed: bool,
    pub age_range: AgeRange,
}

/// Wire form of [`BookRequest`]; negative or fractional page counts are
/// rejected with a [`GeometryError`]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookRequestRecord {
    theme: String,
    page_count: serde_json::Number,
    #[serde(default)]
    paper: PaperTint,
    #[serde(default)]
    trim: TrimSize,
    #[serde(default)]
    include_bleed: bool,
    #[serde(default)]
    age_range: AgeRange,
}

impl TryFrom<BookRequestRecord> for BookRequest {
    type Error = GeometryError;

    fn try_from(record: BookRequestRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            theme: record.theme,
            page_count: page_count_from_number(&record.page_count)?,
            paper: record.paper,
            trim: record.trim,
            include_bleed: record.include_bleed,
            age_range: record.age_range,
        })
    }
}

impl From<BookRequest> for BookRequestRecord {
    fn from(book: BookRequest) -> Self {
        Self {
            theme: book.theme,
            page_count: book.page_count.into(),
            paper: book.paper,
            trim: book.trim,
            include_bleed: book.include_bleed,
            age_range: book.age_range,
        }
    }
}

impl BookRequest {
    pub fn new(theme: impl Into<String>, page_count: u32, paper: PaperTint) -> Self {
        Self {
            theme: theme.into(),
            page_count,
            paper,
            trim: TrimSize::default(),
            include_bleed: false,
            age_range: AgeRange::default(),
        }
    }

    pub fn print_spec(&self) -> std::result::Result<PrintSpec, GeometryError> {
        PrintSpec::new(self.trim, self.page_count, self.paper, self.include_bleed)
    }
}

/// Full KDP package: interior, front cover and cover wrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdpGenerationPayload {
    #[serde(flatten)]
    pub book: BookRequest,
    #[serde(default)]
    pub mode: BookMode,
}

/// Assemble an already validated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfGenerationPayload {
    pub plan: BookPlan,
}

/// What a job does, with its typed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum JobKind {
    KdpGeneration(KdpGenerationPayload),
    StoryGeneration(BookRequest),
    ColoringGeneration(BookRequest),
    ActivityGeneration(BookRequest),
    PdfGeneration(PdfGenerationPayload),
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::KdpGeneration(_) => "kdp-generation",
            JobKind::StoryGeneration(_) => "story-generation",
            JobKind::ColoringGeneration(_) => "coloring-generation",
            JobKind::ActivityGeneration(_) => "activity-generation",
            JobKind::PdfGeneration(_) => "pdf-generation",
        }
    }

    pub fn mode(&self) -> BookMode {
        match self {
            JobKind::KdpGeneration(p) => p.mode,
            JobKind::StoryGeneration(_) => BookMode::Story,
            JobKind::ColoringGeneration(_) => BookMode::Coloring,
            JobKind::ActivityGeneration(_) => BookMode::Activity,
            JobKind::PdfGeneration(p) => p.plan.mode(),
        }
    }

    /// The book request for generating kinds; `None` for plan assembly
    pub fn book(&self) -> Option<&BookRequest> {
        match self {
            JobKind::KdpGeneration(p) => Some(&p.book),
            JobKind::StoryGeneration(b)
            | JobKind::ColoringGeneration(b)
            | JobKind::ActivityGeneration(b) => Some(b),
            JobKind::PdfGeneration(_) => None,
        }
    }

    /// Validated print spec, failing on bad geometry before a job exists
    pub fn print_spec(&self) -> std::result::Result<PrintSpec, GeometryError> {
        match self {
            JobKind::KdpGeneration(p) => p.book.print_spec(),
            JobKind::StoryGeneration(b)
            | JobKind::ColoringGeneration(b)
            | JobKind::ActivityGeneration(b) => b.print_spec(),
            JobKind::PdfGeneration(p) => Ok(*p.plan.print_spec()),
        }
    }

    /// Upper bound on images a run may request: every content page plus the
    /// cover, for modes that illustrate pages
    pub fn max_images(&self) -> u64 {
        self.book()
            .map(|book| content_slots(book.page_count) as u64 + 1)
            .unwrap_or(0)
    }

    /// Whether the run produces cover PDFs alongside the interior
    pub fn includes_covers(&self) -> bool {
        matches!(self, JobKind::KdpGeneration(_) | JobKind::PdfGeneration(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFiles {
    pub interior: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_wrap: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub files: JobFiles,
    pub page_count: u32,
    pub spine_width: f64,
    pub plan: BookPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub requester: Requester,
    pub status: JobStatus,
    /// Advisory 0..=100
    pub progress: u8,
    pub priority: JobPriority,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Image quota for this job is held; retries reuse it
    #[serde(default)]
    pub images_reserved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Insertion order, assigned by the store
    #[serde(default)]
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(kind: JobKind, requester: Requester, priority: JobPriority, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            requester,
            status: JobStatus::Pending,
            progress: 0,
            priority,
            retry_count: 0,
            max_retries,
            images_reserved: false,
            result: None,
            error: None,
            sequence: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Queue score: priority offset, sunk by one per retry
    pub fn score(&self) -> i64 {
        self.priority.offset() - self.retry_count as i64
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView::from(self)
    }
}

/// What a polling client sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            progress: job.progress,
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}

/// Lifecycle events pushed to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Created { id: JobId, kind: &'static str },
    Started { id: JobId },
    Progress { id: JobId, progress: u8 },
    Completed { id: JobId },
    Retrying { id: JobId, retry_count: u32, error: String },
    Failed { id: JobId, error: String },
    Cancelled { id: JobId },
}

impl JobUpdate {
    pub fn job_id(&self) -> JobId {
        match self {
            JobUpdate::Created { id, .. }
            | JobUpdate::Started { id }
            | JobUpdate::Progress { id, .. }
            | JobUpdate::Completed { id }
            | JobUpdate::Retrying { id, .. }
            | JobUpdate::Failed { id, .. }
            | JobUpdate::Cancelled { id } => *id,
        }
    }
}
