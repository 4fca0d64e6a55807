use crate::geometry::{cover_wrap_size, page_size};
use crate::plan::BookPlan;
use crate::types::*;
use std::collections::BTreeMap;

/// Summary of a plan for previews and the CLI
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStatistics {
    /// Total pages, structural pages included
    pub page_count: usize,
    /// Pages that carry generated content
    pub content_pages: usize,
    /// Physical leaves (two pages per leaf)
    pub leaves: usize,
    /// Page count per kind
    pub pages_by_kind: BTreeMap<PageKind, usize>,
    /// Pages that will request artwork
    pub image_pages: usize,
    pub margins: Margins,
    pub spine_width_in: f64,
    /// Interior page size including bleed
    pub page_size_in: (f64, f64),
    /// Full cover spread size
    pub cover_size_in: (f64, f64),
}

/// Calculate statistics for a validated plan
pub fn calculate_statistics(plan: &BookPlan) -> PlanStatistics {
    let mut pages_by_kind = BTreeMap::new();
    for page in plan.pages() {
        *pages_by_kind.entry(page.kind).or_insert(0) += 1;
    }

    let page_count = plan.pages().len();
    let content_pages = plan
        .pages()
        .iter()
        .filter(|p| !p.kind.is_structural())
        .count();
    let image_pages = plan.pages().iter().filter(|p| p.kind.wants_image()).count();

    let spec = plan.print_spec();
    let cover = cover_wrap_size(spec);

    PlanStatistics {
        page_count,
        content_pages,
        leaves: page_count / 2,
        pages_by_kind,
        image_pages,
        margins: spec.margins(),
        spine_width_in: spec.spine_width_in(),
        page_size_in: page_size(spec),
        cover_size_in: (cover.width_in, cover.height_in),
    }
}
