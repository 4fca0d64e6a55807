use crate::types::Result;
use lopdf::{Document, Object};

/// What a produced PDF actually contains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfSummary {
    pub page_count: usize,
    /// MediaBox width and height of the first page, in points
    pub first_page_size_pt: Option<(f32, f32)>,
}

/// Re-read assembled bytes to confirm their page count and size
pub fn inspect_pdf(bytes: &[u8]) -> Result<PdfSummary> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();

    let first_page_size_pt = match pages.values().next() {
        Some(&page_id) => media_box_size(&doc, page_id)?,
        None => None,
    };

    Ok(PdfSummary {
        page_count: pages.len(),
        first_page_size_pt,
    })
}

fn media_box_size(doc: &Document, page_id: lopdf::ObjectId) -> Result<Option<(f32, f32)>> {
    let page_dict = doc.get_dictionary(page_id)?;

    let Ok(mb) = page_dict.get(b"MediaBox").and_then(|obj| obj.as_array()) else {
        return Ok(None);
    };
    if mb.len() < 4 {
        return Ok(None);
    }

    let size = match (
        extract_number(&mb[0]),
        extract_number(&mb[1]),
        extract_number(&mb[2]),
        extract_number(&mb[3]),
    ) {
        (Some(x0), Some(y0), Some(x1), Some(y1)) => Some((x1 - x0, y1 - y0)),
        _ => None,
    };
    Ok(size)
}

fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
