use crate::canvas::{PageCanvas, save_document};
use crate::options::AssemblerOptions;
use crate::types::{ContentMap, PageContent, Result};
use kdp_layout::{BookPlan, PageKind, PlannedPage, Rect, content_box, page_size};
use printpdf::{BuiltinFont, PdfDocument};

/// Lay out one physical page per plan page.
///
/// Missing images render text-only; missing text falls back to
/// [`placeholder_text`].
pub async fn assemble_interior(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let plan = plan.clone();
    let content = content.clone();
    let options = options.clone();

    tokio::task::spawn_blocking(move || assemble_interior_bytes(&plan, &content, &options)).await?
}

pub fn assemble_interior_bytes(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let spec = plan.print_spec();
    let (width_in, height_in) = page_size(spec);

    let mut doc = PdfDocument::new(&options.document_title);
    let mut pages = Vec::with_capacity(plan.pages().len());
    let mut missing_images = 0;

    for page in plan.pages() {
        let resolved = content.get(&page.index);
        let text = resolve_text(page, resolved);
        let image = resolved.and_then(|c| c.image.as_deref());
        if page.kind.wants_image() && image.is_none() {
            missing_images += 1;
        }

        let area = content_box(spec, page.index);
        let mut canvas = PageCanvas::new(&mut doc, width_in, height_in);
        layout_page(&mut canvas, page, &text, image, area, options);
        pages.push(canvas.finish());
    }

    if missing_images > 0 {
        log::warn!(
            "Assembled '{}' with {} page(s) missing artwork",
            plan.title(),
            missing_images
        );
    }

    doc.pages = pages;

    save_document(&doc)
}

/// Text shown when a page has no resolved text
pub fn placeholder_text(index: u32) -> String {
    format!("Page {}", index + 1)
}

/// Resolved text, then the plan's own text or blurb, then a placeholder
pub(crate) fn resolve_text(page: &PlannedPage, resolved: Option<&PageContent>) -> String {
    resolved
        .and_then(|c| c.text.clone())
        .or_else(|| page.payload.text.clone())
        .or_else(|| page.payload.blurb.clone())
        .unwrap_or_else(|| placeholder_text(page.index))
}

fn layout_page(
    canvas: &mut PageCanvas<'_>,
    page: &PlannedPage,
    text: &str,
    image: Option<&[u8]>,
    area: Rect,
    options: &AssemblerOptions,
) {
    let center_x = area.x_in + area.width_in / 2.0;
    let mut area = area;

    match page.kind {
        PageKind::Spine => {
            let title = page.payload.title.as_deref().unwrap_or(text);
            canvas.centered_line(
                title,
                center_x,
                area.y_in + area.height_in / 2.0,
                options.spine_font_size_pt,
                BuiltinFont::HelveticaBold,
            );
            return;
        }
        PageKind::Cover => {
            let title = page.payload.title.as_deref().unwrap_or(text);
            area = title_strip(canvas, title, area, options.title_font_size_pt);
            if let Some(bytes) = image {
                canvas.image(bytes, area);
            }
            return;
        }
        _ => {}
    }

    if let Some(title) = page.payload.title.as_deref() {
        area = title_strip(canvas, title, area, options.body_font_size_pt * 1.5);
    }

    let drawn = match image {
        Some(bytes) if page.kind.wants_image() => {
            let image_height = area.height_in * options.image_share as f64;
            let image_area = Rect {
                y_in: area.y_in + area.height_in - image_height,
                height_in: image_height,
                ..area
            };
            canvas.image(bytes, image_area)
        }
        _ => false,
    };

    if drawn {
        area.height_in *= 1.0 - options.image_share as f64;
    }

    let mut body = text.to_string();
    for step in &page.payload.steps {
        body.push('\n');
        body.push_str(step);
    }
    if !page.payload.words.is_empty() {
        body.push('\n');
        body.push_str(&page.payload.words.join("  "));
    }

    canvas.paragraph(&body, area, options.body_font_size_pt, options.line_spacing);
}

/// Draw a centered title at the top of `area`, returning the area below it
fn title_strip(canvas: &mut PageCanvas<'_>, title: &str, area: Rect, size_pt: f32) -> Rect {
    let strip_in = size_pt as f64 * 1.6 / 72.0;
    canvas.centered_line(
        title,
        area.x_in + area.width_in / 2.0,
        area.y_in + area.height_in - size_pt as f64 / 72.0,
        size_pt,
        BuiltinFont::HelveticaBold,
    );
    Rect {
        height_in: (area.height_in - strip_in).max(0.0),
        ..area
    }
}
