//! Book plans - the validated, ordered page sequence of one book

use crate::constants::STRUCTURAL_PAGES;
use crate::geometry::PrintSpec;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Validated book plan.
///
/// Immutable once built: a regenerated plan is a new `BookPlan`. The page
/// count always equals `print_spec().page_count()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "BookPlanRecord", into = "BookPlanRecord")
)]
pub struct BookPlan {
    print_spec: PrintSpec,
    age_range: AgeRange,
    mode: BookMode,
    pages: Vec<PlannedPage>,
}

/// Margins and spine width derived from a plan's print spec
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DerivedGeometry {
    pub margins: Margins,
    pub spine_width: f64,
}

/// Validate `planned_pages` against the print spec and mode.
///
/// Every problem is collected; callers regenerate instead of accepting a
/// partial plan.
pub fn build_plan(
    print_spec: PrintSpec,
    age_range: AgeRange,
    mode: BookMode,
    planned_pages: Vec<PlannedPage>,
) -> std::result::Result<BookPlan, ValidationError> {
    let mut problems = Vec::new();

    let expected = print_spec.page_count() as usize;
    if planned_pages.len() != expected {
        problems.push(PlanProblem::PageCountMismatch {
            expected,
            actual: planned_pages.len(),
        });
    }

    for (position, page) in planned_pages.iter().enumerate() {
        if page.index as usize != position {
            problems.push(PlanProblem::IndexMismatch {
                position,
                index: page.index,
            });
        }
    }

    for kind in [PageKind::Cover, PageKind::Back, PageKind::Spine] {
        let count = planned_pages.iter().filter(|p| p.kind == kind).count();
        if count != 1 {
            problems.push(PlanProblem::StructuralPageCount { kind, count });
        }
    }

    for page in planned_pages.iter().filter(|p| !p.kind.is_structural()) {
        if !mode.allows(page.kind) {
            problems.push(PlanProblem::KindNotAllowed {
                index: page.index,
                kind: page.kind,
                mode,
            });
        }
    }

    if !problems.is_empty() {
        return Err(ValidationError { problems });
    }

    Ok(BookPlan {
        print_spec,
        age_range,
        mode,
        pages: planned_pages,
    })
}

/// Margins and spine width for the plan's print spec
pub fn derived_geometry(plan: &BookPlan) -> DerivedGeometry {
    DerivedGeometry {
        margins: plan.print_spec.margins(),
        spine_width: plan.print_spec.spine_width_in(),
    }
}

impl BookPlan {
    pub fn print_spec(&self) -> &PrintSpec {
        &self.print_spec
    }

    pub fn age_range(&self) -> AgeRange {
        self.age_range
    }

    pub fn mode(&self) -> BookMode {
        self.mode
    }

    pub fn pages(&self) -> &[PlannedPage] {
        &self.pages
    }

    pub fn page(&self, index: u32) -> Option<&PlannedPage> {
        self.pages.get(index as usize)
    }

    /// The single page of `kind`, for COVER, BACK and SPINE
    pub fn structural_page(&self, kind: PageKind) -> Option<&PlannedPage> {
        self.pages.iter().find(|p| p.kind == kind)
    }

    /// Title from the cover page
    pub fn title(&self) -> &str {
        self.structural_page(PageKind::Cover)
            .and_then(|p| p.payload.title.as_deref())
            .unwrap_or("Untitled")
    }

    pub fn geometry(&self) -> DerivedGeometry {
        derived_geometry(self)
    }

    /// Count of pages with each kind
    pub fn count_kind(&self, kind: PageKind) -> usize {
        self.pages.iter().filter(|p| p.kind == kind).count()
    }
}

#[cfg(feature = "serde")]
impl BookPlan {
    /// JSON contract handed to the assembler and UI previews
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LayoutError::Format(format!("Failed to serialize plan: {}", e)))
    }

    /// Parse and validate a plan from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LayoutError::Format(format!("Failed to parse plan: {}", e)))
    }

    /// Load a plan from a JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Save the plan to a JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = self.to_json()?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookPlanRecord {
    print_spec: PrintSpec,
    age_range: AgeRange,
    mode: BookMode,
    pages: Vec<PlannedPage>,
    // Derived on output, ignored on input
    #[serde(default, skip_deserializing)]
    margins: Option<Margins>,
    #[serde(default, skip_deserializing)]
    spine_width: Option<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<BookPlanRecord> for BookPlan {
    type Error = ValidationError;

    fn try_from(record: BookPlanRecord) -> std::result::Result<Self, Self::Error> {
        build_plan(record.print_spec, record.age_range, record.mode, record.pages)
    }
}

#[cfg(feature = "serde")]
impl From<BookPlan> for BookPlanRecord {
    fn from(plan: BookPlan) -> Self {
        let geometry = derived_geometry(&plan);
        Self {
            print_spec: plan.print_spec,
            age_range: plan.age_range,
            mode: plan.mode,
            pages: plan.pages,
            margins: Some(geometry.margins),
            spine_width: Some(geometry.spine_width),
        }
    }
}

/// Number of generated content pages a book of `page_count` pages needs
pub fn content_slots(page_count: u32) -> usize {
    page_count.saturating_sub(STRUCTURAL_PAGES) as usize
}

/// Force generated content to exactly `target` pages.
///
/// Trailing extra pages are dropped; missing pages are filled with
/// placeholders of `filler` kind referencing `prompt`. Indices are rewritten
/// to be contiguous from zero.
pub fn normalize_page_count(
    mut pages: Vec<PlannedPage>,
    target: usize,
    prompt: &str,
    filler: PageKind,
) -> Vec<PlannedPage> {
    pages.truncate(target);
    while pages.len() < target {
        let n = pages.len() + 1;
        pages.push(PlannedPage::new(
            0,
            filler,
            PagePayload {
                title: Some(format!("{} #{}", prompt, n)),
                prompt: Some(format!("{}, page {}", prompt, n)),
                ..Default::default()
            },
        ));
    }
    reindex(&mut pages);
    pages
}

/// Wrap content pages with the structural pages every printed book needs:
/// COVER first, then content, then SPINE and BACK.
pub fn compose_book(
    title: &str,
    cover_prompt: &str,
    blurb: &str,
    content: Vec<PlannedPage>,
) -> Vec<PlannedPage> {
    let mut pages = Vec::with_capacity(content.len() + STRUCTURAL_PAGES as usize);
    pages.push(PlannedPage::new(
        0,
        PageKind::Cover,
        PagePayload {
            title: Some(title.to_string()),
            prompt: Some(cover_prompt.to_string()),
            ..Default::default()
        },
    ));
    pages.extend(content);
    pages.push(PlannedPage::new(0, PageKind::Spine, PagePayload::titled(title)));
    pages.push(PlannedPage::new(
        0,
        PageKind::Back,
        PagePayload {
            title: Some(title.to_string()),
            blurb: Some(blurb.to_string()),
            ..Default::default()
        },
    ));
    reindex(&mut pages);
    pages
}

fn reindex(pages: &mut [PlannedPage]) {
    for (i, page) in pages.iter_mut().enumerate() {
        page.index = i as u32;
    }
}
