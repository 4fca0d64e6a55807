//! Drawing helpers over printpdf operations, measured in inches

use crate::types::{AssembleError, Result};
use kdp_layout::Rect;
use kdp_layout::constants::{in_to_mm, in_to_pt};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, RawImage, RawImageData,
    RawImageFormat, TextItem, XObjectTransform,
};

/// Approximate character width ratio for Helvetica
pub(crate) const HELVETICA_CHAR_WIDTH_RATIO: f64 = 0.5;

/// Ops for one physical page
pub(crate) struct PageCanvas<'a> {
    doc: &'a mut PdfDocument,
    width_in: f64,
    height_in: f64,
    ops: Vec<Op>,
}

impl<'a> PageCanvas<'a> {
    pub fn new(doc: &'a mut PdfDocument, width_in: f64, height_in: f64) -> Self {
        Self {
            doc,
            width_in,
            height_in,
            ops: Vec::new(),
        }
    }

    pub fn height_in(&self) -> f64 {
        self.height_in
    }

    /// Write a single line with its baseline at (x, y)
    pub fn text_line(&mut self, text: &str, x_in: f64, y_in: f64, size_pt: f32, font: BuiltinFont) {
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(in_to_pt(x_in) as f32),
                y: Pt(in_to_pt(y_in) as f32),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            font,
            size: Pt(size_pt),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    /// Write a line horizontally centered on `center_x_in`
    pub fn centered_line(
        &mut self,
        text: &str,
        center_x_in: f64,
        y_in: f64,
        size_pt: f32,
        font: BuiltinFont,
    ) {
        let x_in = center_x_in - text_width_in(text, size_pt) / 2.0;
        self.text_line(text, x_in, y_in, size_pt, font);
    }

    /// Word-wrapped text flowing down from the top of `area`.
    ///
    /// Lines that do not fit are dropped. Returns the height used.
    pub fn paragraph(&mut self, text: &str, area: Rect, size_pt: f32, spacing: f32) -> f64 {
        let line_height_in = size_pt as f64 * spacing as f64 / 72.0;
        let max_chars = max_chars_per_line(area.width_in, size_pt);
        let max_lines = (area.height_in / line_height_in).floor() as usize;

        let lines = wrap_text(text, max_chars);
        let shown = lines.len().min(max_lines);
        for (i, line) in lines.iter().take(shown).enumerate() {
            let baseline = area.y_in + area.height_in - (i + 1) as f64 * line_height_in;
            self.text_line(line, area.x_in, baseline, size_pt, BuiltinFont::Helvetica);
        }
        shown as f64 * line_height_in
    }

    /// Place an encoded image inside `area`, centered and aspect-preserving.
    ///
    /// Returns false when the bytes cannot be decoded; the page then renders
    /// without artwork.
    pub fn image(&mut self, bytes: &[u8], area: Rect) -> bool {
        let Some(raw) = decode_image(bytes) else {
            return false;
        };
        if raw.width == 0 || raw.height == 0 {
            return false;
        }

        // At 72 dpi one pixel is one point, so scale maps pixels to points
        let box_w_pt = in_to_pt(area.width_in);
        let box_h_pt = in_to_pt(area.height_in);
        let scale = (box_w_pt / raw.width as f64).min(box_h_pt / raw.height as f64);
        let drawn_w_pt = raw.width as f64 * scale;
        let drawn_h_pt = raw.height as f64 * scale;
        let x_pt = in_to_pt(area.x_in) + (box_w_pt - drawn_w_pt) / 2.0;
        let y_pt = in_to_pt(area.y_in) + (box_h_pt - drawn_h_pt) / 2.0;

        let id = self.doc.add_image(&raw);
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_pt as f32)),
                translate_y: Some(Pt(y_pt as f32)),
                scale_x: Some(scale as f32),
                scale_y: Some(scale as f32),
                dpi: Some(72.0),
                ..Default::default()
            },
        });
        true
    }

    pub fn finish(self) -> PdfPage {
        PdfPage::new(
            Mm(in_to_mm(self.width_in) as f32),
            Mm(in_to_mm(self.height_in) as f32),
            self.ops,
        )
    }
}

/// Serialize the document, treating empty output as a failure
pub(crate) fn save_document(doc: &PdfDocument) -> Result<Vec<u8>> {
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s) while saving", warnings.len());
    }
    if bytes.is_empty() {
        return Err(AssembleError::Pdf("document serialized to zero bytes".to_string()));
    }
    Ok(bytes)
}

fn decode_image(bytes: &[u8]) -> Option<RawImage> {
    match ::image::load_from_memory(bytes) {
        Ok(decoded) => {
            let rgb = decoded.to_rgb8();
            let (width, height) = rgb.dimensions();
            Some(RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            })
        }
        Err(e) => {
            log::warn!("Skipping undecodable page image: {}", e);
            None
        }
    }
}

/// Estimated rendered width of `text` in inches
pub(crate) fn text_width_in(text: &str, size_pt: f32) -> f64 {
    text.chars().count() as f64 * size_pt as f64 * HELVETICA_CHAR_WIDTH_RATIO / 72.0
}

fn max_chars_per_line(width_in: f64, size_pt: f32) -> usize {
    let char_width_in = size_pt as f64 * HELVETICA_CHAR_WIDTH_RATIO / 72.0;
    ((width_in / char_width_in).floor() as usize).max(1)
}

/// Greedy word wrap; words longer than a line are split
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current.is_empty() {
                word.len()
            } else {
                current.chars().count() + 1 + word.len()
            };
            if needed > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = wrap_text("abcdefghijkl xy", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl xy"]);
    }

    #[test]
    fn wrap_keeps_paragraphs() {
        let lines = wrap_text("one\ntwo three", 20);
        assert_eq!(lines, vec!["one", "two three"]);
    }
}
