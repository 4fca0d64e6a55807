use crate::constants::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Invalid physical dimensions. Raised before any job exists and never
/// retried: the calculator does not clamp or round a customer's book.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid page count {count}: must be even and between 24 and 828")]
    InvalidPageCount { count: i64 },
    #[error("Page count must be a whole number, got {value}")]
    NonIntegerPageCount { value: f64 },
    #[error("Invalid trim size {width_in}x{height_in} in")]
    InvalidTrimSize { width_in: f64, height_in: f64 },
}

/// A planned page sequence that cannot become a BookPlan
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid book plan: {}", format_problems(.problems))]
pub struct ValidationError {
    pub problems: Vec<PlanProblem>,
}

fn format_problems(problems: &[PlanProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// One reason a plan was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum PlanProblem {
    /// `pages.len()` differs from the print spec's page count
    PageCountMismatch { expected: usize, actual: usize },
    /// Page at `position` carries a different index
    IndexMismatch { position: usize, index: u32 },
    /// COVER, BACK and SPINE must each appear exactly once
    StructuralPageCount { kind: PageKind, count: usize },
    /// Content page whose kind does not belong to the requested mode
    KindNotAllowed {
        index: u32,
        kind: PageKind,
        mode: BookMode,
    },
}

impl fmt::Display for PlanProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanProblem::PageCountMismatch { expected, actual } => {
                write!(f, "expected {} pages, found {}", expected, actual)
            }
            PlanProblem::IndexMismatch { position, index } => {
                write!(f, "page at position {} has index {}", position, index)
            }
            PlanProblem::StructuralPageCount { kind, count } => {
                write!(f, "expected exactly one {} page, found {}", kind, count)
            }
            PlanProblem::KindNotAllowed { index, kind, mode } => {
                write!(f, "page {} is {} which is not allowed in {} books", index, kind, mode)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid plan file: {0}")]
    Format(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Paper stock, which decides page thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum PaperTint {
    #[default]
    White,
    Cream,
}

impl PaperTint {
    /// Thickness of a single page in inches
    pub fn page_thickness_in(self) -> f64 {
        match self {
            PaperTint::White => WHITE_PAGE_THICKNESS_IN,
            PaperTint::Cream => CREAM_PAGE_THICKNESS_IN,
        }
    }
}

impl FromStr for PaperTint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WHITE" => Ok(PaperTint::White),
            "CREAM" => Ok(PaperTint::Cream),
            other => Err(format!("unknown paper tint '{}'", other)),
        }
    }
}

/// KDP trim sizes offered for children's books
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrimSize {
    /// 8.5" x 11"
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "8.5x11"))]
    Letter,
    /// 8" x 10"
    #[cfg_attr(feature = "serde", serde(rename = "8x10"))]
    Portrait8x10,
    /// 8.5" x 8.5"
    #[cfg_attr(feature = "serde", serde(rename = "8.5x8.5"))]
    Square,
    /// 6" x 9"
    #[cfg_attr(feature = "serde", serde(rename = "6x9"))]
    Trade6x9,
    /// 7" x 10"
    #[cfg_attr(feature = "serde", serde(rename = "7x10"))]
    Large7x10,
    #[cfg_attr(feature = "serde", serde(rename = "custom"))]
    Custom { width_in: f64, height_in: f64 },
}

impl TrimSize {
    /// Trim dimensions (width, height) in inches
    pub fn dimensions_in(self) -> (f64, f64) {
        match self {
            TrimSize::Letter => (8.5, 11.0),
            TrimSize::Portrait8x10 => (8.0, 10.0),
            TrimSize::Square => (8.5, 8.5),
            TrimSize::Trade6x9 => (6.0, 9.0),
            TrimSize::Large7x10 => (7.0, 10.0),
            TrimSize::Custom {
                width_in,
                height_in,
            } => (width_in, height_in),
        }
    }

    /// Check the trim against KDP's printable range
    pub fn validate(self) -> std::result::Result<(), GeometryError> {
        let (w, h) = self.dimensions_in();
        let width_ok = w.is_finite() && (MIN_TRIM_WIDTH_IN..=MAX_TRIM_WIDTH_IN).contains(&w);
        let height_ok = h.is_finite() && (MIN_TRIM_HEIGHT_IN..=MAX_TRIM_HEIGHT_IN).contains(&h);
        if width_ok && height_ok {
            Ok(())
        } else {
            Err(GeometryError::InvalidTrimSize {
                width_in: w,
                height_in: h,
            })
        }
    }
}

impl FromStr for TrimSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "8.5x11" => return Ok(TrimSize::Letter),
            "8x10" => return Ok(TrimSize::Portrait8x10),
            "8.5x8.5" => return Ok(TrimSize::Square),
            "6x9" => return Ok(TrimSize::Trade6x9),
            "7x10" => return Ok(TrimSize::Large7x10),
            _ => {}
        }
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("trim size '{}' is not WIDTHxHEIGHT", s))?;
        let width_in = w.trim().parse::<f64>().map_err(|e| e.to_string())?;
        let height_in = h.trim().parse::<f64>().map_err(|e| e.to_string())?;
        Ok(TrimSize::Custom {
            width_in,
            height_in,
        })
    }
}

/// Page margins in inches. Pure function of the page count.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Margins {
    /// Head margin
    #[cfg_attr(feature = "serde", serde(rename = "top"))]
    pub top_in: f64,
    /// Tail margin
    #[cfg_attr(feature = "serde", serde(rename = "bottom"))]
    pub bottom_in: f64,
    /// Fore-edge margin
    #[cfg_attr(feature = "serde", serde(rename = "outer"))]
    pub outer_in: f64,
    /// Gutter margin, widened for thicker books
    #[cfg_attr(feature = "serde", serde(rename = "inner"))]
    pub inner_in: f64,
}

/// Reader age band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AgeRange {
    #[cfg_attr(feature = "serde", serde(rename = "2-4"))]
    Toddler,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "5-7"))]
    EarlyReader,
    #[cfg_attr(feature = "serde", serde(rename = "8-12"))]
    MiddleGrade,
}

impl AgeRange {
    pub fn label(self) -> &'static str {
        match self {
            AgeRange::Toddler => "2-4",
            AgeRange::EarlyReader => "5-7",
            AgeRange::MiddleGrade => "8-12",
        }
    }
}

impl FromStr for AgeRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "2-4" => Ok(AgeRange::Toddler),
            "5-7" => Ok(AgeRange::EarlyReader),
            "8-12" => Ok(AgeRange::MiddleGrade),
            other => Err(format!("unknown age range '{}'", other)),
        }
    }
}

/// Kind of a page in a BookPlan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum PageKind {
    Cover,
    Back,
    Spine,
    Coloring,
    Maze,
    WordSearch,
    Tracing,
    Story,
    Info,
}

impl PageKind {
    pub const ALL: [PageKind; 9] = [
        PageKind::Cover,
        PageKind::Back,
        PageKind::Spine,
        PageKind::Coloring,
        PageKind::Maze,
        PageKind::WordSearch,
        PageKind::Tracing,
        PageKind::Story,
        PageKind::Info,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PageKind::Cover => "COVER",
            PageKind::Back => "BACK",
            PageKind::Spine => "SPINE",
            PageKind::Coloring => "COLORING",
            PageKind::Maze => "MAZE",
            PageKind::WordSearch => "WORDSEARCH",
            PageKind::Tracing => "TRACING",
            PageKind::Story => "STORY",
            PageKind::Info => "INFO",
        }
    }

    /// COVER, BACK and SPINE
    pub fn is_structural(self) -> bool {
        matches!(self, PageKind::Cover | PageKind::Back | PageKind::Spine)
    }

    /// Whether the page carries generated artwork
    pub fn wants_image(self) -> bool {
        matches!(
            self,
            PageKind::Cover | PageKind::Coloring | PageKind::Story | PageKind::Maze
        )
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace(['-', '_', ' '], "");
        PageKind::ALL
            .into_iter()
            .find(|kind| kind.name() == upper)
            .ok_or_else(|| format!("unknown page kind '{}'", s))
    }
}

/// Requested content of the book interior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum BookMode {
    #[default]
    Coloring,
    Story,
    Activity,
}

impl BookMode {
    /// Whether a non-structural page of `kind` may appear in this mode.
    /// INFO pages ("this book belongs to", answer keys) fit every mode.
    pub fn allows(self, kind: PageKind) -> bool {
        match kind {
            PageKind::Info => true,
            PageKind::Coloring => self == BookMode::Coloring,
            PageKind::Story => self == BookMode::Story,
            PageKind::Maze | PageKind::WordSearch | PageKind::Tracing => {
                self == BookMode::Activity
            }
            PageKind::Cover | PageKind::Back | PageKind::Spine => false,
        }
    }

    /// Kind used when padding a short plan
    pub fn filler_kind(self) -> PageKind {
        match self {
            BookMode::Coloring => PageKind::Coloring,
            BookMode::Story => PageKind::Story,
            BookMode::Activity => PageKind::Maze,
        }
    }
}

impl fmt::Display for BookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookMode::Coloring => "COLORING",
            BookMode::Story => "STORY",
            BookMode::Activity => "ACTIVITY",
        })
    }
}

impl FromStr for BookMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COLORING" => Ok(BookMode::Coloring),
            "STORY" => Ok(BookMode::Story),
            "ACTIVITY" => Ok(BookMode::Activity),
            other => Err(format!("unknown book mode '{}'", other)),
        }
    }
}

/// Kind-specific page content. Only the fields relevant to the kind are set.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PagePayload {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    /// Image prompt
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub prompt: Option<String>,
    /// Back cover copy
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub blurb: Option<String>,
    /// Body text (story pages, info pages)
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub text: Option<String>,
    /// Instructions (tracing, mazes)
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub steps: Vec<String>,
    /// Word list for word searches
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub words: Vec<String>,
}

impl PagePayload {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// One page of a plan, as produced by the planning step
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlannedPage {
    pub index: u32,
    pub kind: PageKind,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: PagePayload,
}

impl PlannedPage {
    pub fn new(index: u32, kind: PageKind, payload: PagePayload) -> Self {
        Self {
            index,
            kind,
            payload,
        }
    }
}
