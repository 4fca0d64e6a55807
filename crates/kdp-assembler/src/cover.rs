use crate::canvas::{PageCanvas, save_document, text_width_in};
use crate::interior::resolve_text;
use crate::options::AssemblerOptions;
use crate::types::{AssembleError, ContentMap, Result};
use kdp_layout::constants::BASE_MARGIN_IN;
use kdp_layout::{BookPlan, PageKind, Rect, cover_front_size, cover_wrap_size};
use printpdf::{BuiltinFont, PdfDocument};

/// Front cover as a single full-bleed page
pub async fn assemble_cover_front(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let plan = plan.clone();
    let content = content.clone();
    let options = options.clone();

    tokio::task::spawn_blocking(move || assemble_cover_front_bytes(&plan, &content, &options))
        .await?
}

/// Back panel, spine and front panel on one spread
pub async fn assemble_cover_wrap(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let plan = plan.clone();
    let content = content.clone();
    let options = options.clone();

    tokio::task::spawn_blocking(move || assemble_cover_wrap_bytes(&plan, &content, &options))
        .await?
}

pub fn assemble_cover_front_bytes(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let cover = plan
        .structural_page(PageKind::Cover)
        .ok_or(AssembleError::MissingPage(PageKind::Cover))?;
    let (width_in, height_in) = cover_front_size(plan.print_spec());

    let mut doc = PdfDocument::new(&options.document_title);
    let mut canvas = PageCanvas::new(&mut doc, width_in, height_in);

    let panel = Rect {
        x_in: 0.0,
        y_in: 0.0,
        width_in,
        height_in,
    };
    draw_front_panel(&mut canvas, plan.title(), content, cover.index, panel, options);

    let page = canvas.finish();
    doc.pages = vec![page];

    save_document(&doc)
}

pub fn assemble_cover_wrap_bytes(
    plan: &BookPlan,
    content: &ContentMap,
    options: &AssemblerOptions,
) -> Result<Vec<u8>> {
    let cover = plan
        .structural_page(PageKind::Cover)
        .ok_or(AssembleError::MissingPage(PageKind::Cover))?;
    let back = plan
        .structural_page(PageKind::Back)
        .ok_or(AssembleError::MissingPage(PageKind::Back))?;
    let wrap = cover_wrap_size(plan.print_spec());

    let mut doc = PdfDocument::new(&options.document_title);
    let mut canvas = PageCanvas::new(&mut doc, wrap.width_in, wrap.height_in);

    // Back panel: blurb inside the safe area
    let safe = wrap.bleed_in + BASE_MARGIN_IN;
    let back_area = Rect {
        x_in: safe,
        y_in: safe,
        width_in: wrap.spine_x_in - 2.0 * safe,
        height_in: wrap.height_in - 2.0 * safe,
    };
    let blurb = resolve_text(back, content.get(&back.index));
    canvas.paragraph(&blurb, back_area, options.body_font_size_pt, options.line_spacing);

    if wrap.allows_spine_text() {
        draw_spine(
            &mut canvas,
            plan.title(),
            wrap.spine_x_in,
            wrap.spine_width_in,
            options,
        );
    } else {
        log::debug!(
            "Spine of {:.4}in is too narrow for text, leaving it blank",
            wrap.spine_width_in
        );
    }

    let front = Rect {
        x_in: wrap.front_x_in,
        y_in: 0.0,
        width_in: wrap.width_in - wrap.front_x_in,
        height_in: wrap.height_in,
    };
    draw_front_panel(&mut canvas, plan.title(), content, cover.index, front, options);

    let page = canvas.finish();
    doc.pages = vec![page];

    save_document(&doc)
}

fn draw_front_panel(
    canvas: &mut PageCanvas<'_>,
    title: &str,
    content: &ContentMap,
    cover_index: u32,
    panel: Rect,
    options: &AssemblerOptions,
) {
    if let Some(bytes) = content.get(&cover_index).and_then(|c| c.image.as_deref()) {
        canvas.image(bytes, panel);
    }

    // Shrink long titles so they stay inside the panel
    let available_in = panel.width_in - 2.0 * BASE_MARGIN_IN;
    let mut size_pt = options.title_font_size_pt;
    while size_pt > 10.0 && text_width_in(title, size_pt) > available_in {
        size_pt -= 2.0;
    }

    canvas.centered_line(
        title,
        panel.x_in + panel.width_in / 2.0,
        panel.y_in + panel.height_in - 1.0,
        size_pt,
        BuiltinFont::HelveticaBold,
    );
}

/// Spine text stacked one character per line, top to bottom
fn draw_spine(
    canvas: &mut PageCanvas<'_>,
    title: &str,
    spine_x_in: f64,
    spine_width_in: f64,
    options: &AssemblerOptions,
) {
    let size_pt = options
        .spine_font_size_pt
        .min((spine_width_in * 72.0 * 0.8) as f32);
    let step_in = size_pt as f64 * 1.1 / 72.0;
    let center_x = spine_x_in + spine_width_in / 2.0;
    let mut y_in = canvas.height_in() - 1.0;

    for ch in title.chars().filter(|c| !c.is_whitespace()) {
        if y_in < 1.0 {
            break;
        }
        canvas.centered_line(&ch.to_string(), center_x, y_in, size_pt, BuiltinFont::HelveticaBold);
        y_in -= step_in;
    }
}
