use kdp_layout::*;
use proptest::prelude::*;

fn spec(page_count: u32) -> PrintSpec {
    PrintSpec::new(TrimSize::Letter, page_count, PaperTint::White, false).unwrap()
}

fn coloring_pages(n: usize) -> Vec<PlannedPage> {
    (0..n)
        .map(|i| {
            PlannedPage::new(
                i as u32,
                PageKind::Coloring,
                PagePayload {
                    prompt: Some(format!("dinosaur {}", i)),
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// A structurally valid book of exactly `len` pages (len >= 3)
fn book_pages(len: usize) -> Vec<PlannedPage> {
    compose_book("Dinosaurs", "a friendly t-rex", "Color the dinos!", coloring_pages(len - 3))
}

#[test]
fn test_build_plan_accepts_valid_book() {
    let plan = build_plan(spec(30), AgeRange::EarlyReader, BookMode::Coloring, book_pages(30)).unwrap();
    assert_eq!(plan.pages().len(), 30);
    assert_eq!(plan.count_kind(PageKind::Cover), 1);
    assert_eq!(plan.count_kind(PageKind::Back), 1);
    assert_eq!(plan.count_kind(PageKind::Spine), 1);
    assert_eq!(plan.title(), "Dinosaurs");
    assert_eq!(plan.pages()[0].kind, PageKind::Cover);
    assert_eq!(plan.pages()[29].kind, PageKind::Back);
}

#[test]
fn test_build_plan_reports_every_problem() {
    let mut pages = book_pages(30);
    pages.pop(); // drop BACK
    pages[5].index = 17;
    pages[6].kind = PageKind::Story;

    let err = build_plan(spec(30), AgeRange::EarlyReader, BookMode::Coloring, pages).unwrap_err();

    assert!(err.problems.contains(&PlanProblem::PageCountMismatch {
        expected: 30,
        actual: 29
    }));
    assert!(err.problems.contains(&PlanProblem::IndexMismatch {
        position: 5,
        index: 17
    }));
    assert!(err.problems.contains(&PlanProblem::StructuralPageCount {
        kind: PageKind::Back,
        count: 0
    }));
    assert!(err.problems.contains(&PlanProblem::KindNotAllowed {
        index: 6,
        kind: PageKind::Story,
        mode: BookMode::Coloring
    }));
    assert_eq!(err.problems.len(), 4);
}

#[test]
fn test_build_plan_rejects_duplicate_cover() {
    let mut pages = book_pages(24);
    pages[3].kind = PageKind::Cover;
    let err = build_plan(spec(24), AgeRange::Toddler, BookMode::Coloring, pages).unwrap_err();
    assert_eq!(
        err.problems,
        vec![PlanProblem::StructuralPageCount {
            kind: PageKind::Cover,
            count: 2
        }]
    );
}

#[test]
fn test_info_pages_allowed_in_every_mode() {
    for mode in [BookMode::Coloring, BookMode::Story, BookMode::Activity] {
        let mut content: Vec<PlannedPage> = (0..21)
            .map(|_| PlannedPage::new(0, mode.filler_kind(), PagePayload::default()))
            .collect();
        content[0].kind = PageKind::Info;
        let pages = compose_book("Book", "cover", "blurb", content);
        assert!(build_plan(spec(24), AgeRange::MiddleGrade, mode, pages).is_ok());
    }
}

#[test]
fn test_activity_mode_kinds() {
    assert!(BookMode::Activity.allows(PageKind::Maze));
    assert!(BookMode::Activity.allows(PageKind::WordSearch));
    assert!(BookMode::Activity.allows(PageKind::Tracing));
    assert!(!BookMode::Activity.allows(PageKind::Coloring));
    assert!(!BookMode::Story.allows(PageKind::Cover));
}

#[test]
fn test_normalize_pads_and_truncates() {
    let padded = normalize_page_count(coloring_pages(5), 8, "Dinosaurs", PageKind::Coloring);
    assert_eq!(padded.len(), 8);
    assert_eq!(padded[7].index, 7);
    assert!(padded[7].payload.prompt.as_deref().unwrap().contains("Dinosaurs"));
    assert_eq!(padded[4].payload.prompt.as_deref(), Some("dinosaur 4"));

    let truncated = normalize_page_count(coloring_pages(12), 8, "Dinosaurs", PageKind::Coloring);
    assert_eq!(truncated.len(), 8);
    assert_eq!(truncated[7].payload.prompt.as_deref(), Some("dinosaur 7"));
}

#[test]
fn test_derived_geometry() {
    let plan = build_plan(spec(100), AgeRange::EarlyReader, BookMode::Coloring, book_pages(100)).unwrap();
    let geometry = derived_geometry(&plan);
    assert_eq!(geometry.spine_width, 0.23);
    assert_eq!(geometry.margins.inner_in, 0.4375);
}

#[test]
fn test_plan_json_contract() {
    let plan = build_plan(spec(24), AgeRange::Toddler, BookMode::Coloring, book_pages(24)).unwrap();
    let json = plan.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["printSpec"]["pageCount"], 24);
    assert_eq!(value["printSpec"]["paperTint"], "WHITE");
    assert_eq!(value["ageRange"], "2-4");
    assert_eq!(value["pages"][0]["kind"], "COVER");
    assert_eq!(value["pages"][0]["title"], "Dinosaurs");
    assert_eq!(value["margins"]["inner"], 0.375);
    assert_eq!(value["spineWidth"], 0.0552);

    let parsed = BookPlan::from_json(&json).unwrap();
    assert_eq!(parsed, plan);
}

#[test]
fn test_plan_json_is_validated_on_read() {
    let plan = build_plan(spec(24), AgeRange::Toddler, BookMode::Coloring, book_pages(24)).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
    value["pages"].as_array_mut().unwrap().pop();

    let err = BookPlan::from_json(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("expected 24 pages, found 23"));

    value["printSpec"]["pageCount"] = serde_json::json!(25);
    assert!(BookPlan::from_json(&value.to_string()).is_err());
}

#[tokio::test]
async fn test_save_and_load_plan() {
    use tempfile::NamedTempFile;

    let plan = build_plan(spec(30), AgeRange::EarlyReader, BookMode::Coloring, book_pages(30)).unwrap();
    let temp_file = NamedTempFile::new().unwrap();

    plan.save(temp_file.path()).await.unwrap();
    let loaded = BookPlan::load(temp_file.path()).await.unwrap();

    assert_eq!(loaded, plan);
}

#[tokio::test]
async fn test_load_pages_from_csv_file() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "kind,title,prompt,text").unwrap();
    writeln!(file, "cover,Dinos,a t-rex,").unwrap();
    for i in 0..21 {
        writeln!(file, "coloring,,dino {},", i).unwrap();
    }
    writeln!(file, "spine,Dinos,,").unwrap();
    writeln!(file, "back,,,The end").unwrap();
    file.flush().unwrap();

    let pages = load_pages_from_csv(file.path()).await.unwrap();
    assert_eq!(pages.len(), 24);
    assert!(build_plan(spec(24), AgeRange::EarlyReader, BookMode::Coloring, pages).is_ok());
}

proptest! {
    #[test]
    fn prop_mismatched_length_always_rejected(
        half in 12u32..=414,
        len in 3usize..900,
        cream in any::<bool>(),
        bleed in any::<bool>(),
    ) {
        let page_count = half * 2;
        prop_assume!(len != page_count as usize);

        let paper = if cream { PaperTint::Cream } else { PaperTint::White };
        let spec = PrintSpec::new(TrimSize::Trade6x9, page_count, paper, bleed).unwrap();

        let result = build_plan(spec, AgeRange::EarlyReader, BookMode::Coloring, book_pages(len));
        let err = result.unwrap_err();
        prop_assert!(
            err.problems
                .iter()
                .any(|p| matches!(p, PlanProblem::PageCountMismatch { .. })),
            "expected a PageCountMismatch problem"
        );
    }

    #[test]
    fn prop_valid_plans_match_page_count(half in 12u32..=414) {
        let page_count = half * 2;
        let plan = build_plan(
            spec(page_count),
            AgeRange::MiddleGrade,
            BookMode::Coloring,
            book_pages(page_count as usize),
        )
        .unwrap();
        prop_assert_eq!(plan.pages().len(), plan.print_spec().page_count() as usize);
    }
}
