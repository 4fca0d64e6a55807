use kdp_assembler::*;
use kdp_layout::{
    AgeRange, BookMode, BookPlan, PageKind, PagePayload, PaperTint, PlannedPage, PrintSpec,
    TrimSize, build_plan, compose_book, content_slots,
};
use std::io::Cursor;

fn coloring_plan(page_count: u32, include_bleed: bool) -> BookPlan {
    let spec = PrintSpec::new(TrimSize::Letter, page_count, PaperTint::White, include_bleed)
        .unwrap();
    let content = (0..content_slots(page_count))
        .map(|i| {
            PlannedPage::new(
                0,
                PageKind::Coloring,
                PagePayload::titled(format!("Dinosaur {}", i + 1)),
            )
        })
        .collect();
    let pages = compose_book("Dinosaurs", "a friendly dinosaur", "Color them all!", content);
    build_plan(spec, AgeRange::EarlyReader, BookMode::Coloring, pages).unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 24, image::Rgb([200, 120, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn assert_close(actual: f32, expected: f64) {
    assert!(
        (actual as f64 - expected).abs() < 0.5,
        "expected ~{expected}, got {actual}"
    );
}

#[test]
fn test_interior_has_one_page_per_plan_page() {
    let plan = coloring_plan(30, false);
    let bytes = assemble_interior_bytes(&plan, &ContentMap::new(), &AssemblerOptions::default())
        .unwrap();

    let summary = inspect_pdf(&bytes).unwrap();
    assert_eq!(summary.page_count, 30);

    let (w, h) = summary.first_page_size_pt.unwrap();
    assert_close(w, 8.5 * 72.0);
    assert_close(h, 11.0 * 72.0);
}

#[test]
fn test_interior_page_size_includes_bleed() {
    let plan = coloring_plan(24, true);
    let bytes = assemble_interior_bytes(&plan, &ContentMap::new(), &AssemblerOptions::default())
        .unwrap();

    let (w, h) = inspect_pdf(&bytes).unwrap().first_page_size_pt.unwrap();
    assert_close(w, 8.625 * 72.0);
    assert_close(h, 11.25 * 72.0);
}

#[test]
fn test_interior_with_images_and_text() {
    let plan = coloring_plan(24, false);
    let mut content = ContentMap::new();
    content.insert(0, PageContent::default().with_image(png_bytes()));
    content.insert(1, PageContent::text("Color the dinosaur").with_image(png_bytes()));
    content.insert(2, PageContent::text("A page with words only"));

    let bytes =
        assemble_interior_bytes(&plan, &content, &AssemblerOptions::titled("Dinosaurs")).unwrap();
    assert_eq!(inspect_pdf(&bytes).unwrap().page_count, 24);
}

#[test]
fn test_undecodable_image_is_skipped() {
    let plan = coloring_plan(24, false);
    let mut content = ContentMap::new();
    content.insert(3, PageContent::text("broken art").with_image(b"not an image".to_vec()));

    let bytes = assemble_interior_bytes(&plan, &content, &AssemblerOptions::default()).unwrap();
    assert_eq!(inspect_pdf(&bytes).unwrap().page_count, 24);
}

#[test]
fn test_activity_pages_render() {
    let spec = PrintSpec::new(TrimSize::Trade6x9, 24, PaperTint::Cream, false).unwrap();
    let content = (0..content_slots(24))
        .map(|i| {
            let payload = match i % 3 {
                0 => PagePayload {
                    title: Some("Find the words".to_string()),
                    words: vec!["CAT".into(), "DOG".into(), "BIRD".into()],
                    ..Default::default()
                },
                1 => PagePayload {
                    title: Some("Trace".to_string()),
                    steps: vec!["Start at the dot".into(), "Follow the line".into()],
                    ..Default::default()
                },
                _ => PagePayload::titled("Maze"),
            };
            let kind = [PageKind::WordSearch, PageKind::Tracing, PageKind::Maze][i % 3];
            PlannedPage::new(0, kind, payload)
        })
        .collect();
    let pages = compose_book("Puzzles", "puzzle cover", "Lots of puzzles", content);
    let plan = build_plan(spec, AgeRange::MiddleGrade, BookMode::Activity, pages).unwrap();

    let bytes = assemble_interior_bytes(&plan, &ContentMap::new(), &AssemblerOptions::default())
        .unwrap();
    assert_eq!(inspect_pdf(&bytes).unwrap().page_count, 24);
}

#[test]
fn test_cover_front_size() {
    let plan = coloring_plan(100, false);
    let mut content = ContentMap::new();
    content.insert(0, PageContent::default().with_image(png_bytes()));

    let bytes = assemble_cover_front_bytes(&plan, &content, &AssemblerOptions::default()).unwrap();
    let summary = inspect_pdf(&bytes).unwrap();
    assert_eq!(summary.page_count, 1);

    let (w, h) = summary.first_page_size_pt.unwrap();
    assert_close(w, 8.75 * 72.0);
    assert_close(h, 11.25 * 72.0);
}

#[test]
fn test_cover_wrap_size() {
    let plan = coloring_plan(100, false);
    let bytes =
        assemble_cover_wrap_bytes(&plan, &ContentMap::new(), &AssemblerOptions::default()).unwrap();
    let summary = inspect_pdf(&bytes).unwrap();
    assert_eq!(summary.page_count, 1);

    // 0.125 + 8.5 + 0.23 spine + 8.5 + 0.125
    let (w, h) = summary.first_page_size_pt.unwrap();
    assert_close(w, 17.48 * 72.0);
    assert_close(h, 11.25 * 72.0);
}

#[test]
fn test_cover_wrap_with_narrow_spine() {
    // 24 white pages give a 0.0552" spine, too narrow for text
    let plan = coloring_plan(24, false);
    let bytes =
        assemble_cover_wrap_bytes(&plan, &ContentMap::new(), &AssemblerOptions::default()).unwrap();
    assert_eq!(inspect_pdf(&bytes).unwrap().page_count, 1);
}

#[test]
fn test_placeholder_text() {
    assert_eq!(placeholder_text(0), "Page 1");
    assert_eq!(placeholder_text(9), "Page 10");
}

#[test]
fn test_inspect_rejects_garbage() {
    let result = inspect_pdf(b"definitely not a pdf");
    assert!(matches!(result, Err(AssembleError::Inspect(_))));
}

#[tokio::test]
async fn test_async_assembly() {
    let plan = coloring_plan(24, false);
    let options = AssemblerOptions::titled(plan.title());
    let content = ContentMap::new();

    let interior = assemble_interior(&plan, &content, &options).await.unwrap();
    let front = assemble_cover_front(&plan, &content, &options).await.unwrap();
    let wrap = assemble_cover_wrap(&plan, &content, &options).await.unwrap();

    assert_eq!(inspect_pdf(&interior).unwrap().page_count, 24);
    assert_eq!(inspect_pdf(&front).unwrap().page_count, 1);
    assert_eq!(inspect_pdf(&wrap).unwrap().page_count, 1);
}
