//! Print geometry - trim, margins, bleed and spine width
//!
//! Every function here is pure. Invalid input is reported as a
//! [`GeometryError`]; nothing is clamped or rounded into range.

use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// True iff `n` is an even page count KDP can print
pub fn validate_page_count(n: u32) -> bool {
    (MIN_PAGE_COUNT..=MAX_PAGE_COUNT).contains(&n) && n % 2 == 0
}

/// Typed variant of [`validate_page_count`]
pub fn ensure_page_count(n: u32) -> std::result::Result<u32, GeometryError> {
    if validate_page_count(n) {
        Ok(n)
    } else {
        Err(GeometryError::InvalidPageCount { count: n as i64 })
    }
}

/// Page count from a signed value, e.g. a JSON number or CLI argument
pub fn page_count_from_i64(n: i64) -> std::result::Result<u32, GeometryError> {
    let count = u32::try_from(n).map_err(|_| GeometryError::InvalidPageCount { count: n })?;
    ensure_page_count(count)
}

/// Page count from a floating point value; fractional input is rejected
pub fn page_count_from_f64(value: f64) -> std::result::Result<u32, GeometryError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(GeometryError::NonIntegerPageCount { value });
    }
    page_count_from_i64(value as i64)
}

/// Page count from a JSON number, whether it arrived as an integer or a float
#[cfg(feature = "serde")]
pub fn page_count_from_number(n: &serde_json::Number) -> std::result::Result<u32, GeometryError> {
    match (n.as_i64(), n.as_f64()) {
        (Some(count), _) => page_count_from_i64(count),
        (None, Some(value)) => page_count_from_f64(value),
        (None, None) => Err(GeometryError::InvalidPageCount { count: i64::MAX }),
    }
}

/// Margins for a book of `page_count` pages.
///
/// Top, bottom and outer margins are fixed; the inner margin steps up for
/// thicker books so content stays clear of the binding.
pub fn compute_margins(page_count: u32) -> Margins {
    let inner_in = if page_count > LARGE_INNER_MARGIN_THRESHOLD {
        LARGE_INNER_MARGIN_IN
    } else if page_count > MEDIUM_INNER_MARGIN_THRESHOLD {
        MEDIUM_INNER_MARGIN_IN
    } else {
        BASE_INNER_MARGIN_IN
    };

    Margins {
        top_in: BASE_MARGIN_IN,
        bottom_in: BASE_MARGIN_IN,
        outer_in: BASE_MARGIN_IN,
        inner_in,
    }
}

/// Spine width in inches, rounded to 4 decimal places
pub fn compute_spine_width(page_count: u32, paper: PaperTint) -> f64 {
    round4(page_count as f64 * paper.page_thickness_in())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Validated physical description of a book
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "PrintSpecRecord", into = "PrintSpecRecord")
)]
pub struct PrintSpec {
    trim_width_in: f64,
    trim_height_in: f64,
    page_count: u32,
    paper: PaperTint,
    include_bleed: bool,
}

impl PrintSpec {
    /// Validate page count and trim, failing fast before any job is created
    pub fn new(
        trim: TrimSize,
        page_count: u32,
        paper: PaperTint,
        include_bleed: bool,
    ) -> std::result::Result<Self, GeometryError> {
        ensure_page_count(page_count)?;
        trim.validate()?;
        let (trim_width_in, trim_height_in) = trim.dimensions_in();
        Ok(Self {
            trim_width_in,
            trim_height_in,
            page_count,
            paper,
            include_bleed,
        })
    }

    pub fn trim_width_in(&self) -> f64 {
        self.trim_width_in
    }

    pub fn trim_height_in(&self) -> f64 {
        self.trim_height_in
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn paper(&self) -> PaperTint {
        self.paper
    }

    pub fn include_bleed(&self) -> bool {
        self.include_bleed
    }

    pub fn margins(&self) -> Margins {
        compute_margins(self.page_count)
    }

    pub fn spine_width_in(&self) -> f64 {
        compute_spine_width(self.page_count, self.paper)
    }
}

/// Wire form of [`PrintSpec`]; deserializing goes through validation
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrintSpecRecord {
    trim_width_in: f64,
    trim_height_in: f64,
    page_count: serde_json::Number,
    #[serde(rename = "paperTint")]
    paper: PaperTint,
    include_bleed: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<PrintSpecRecord> for PrintSpec {
    type Error = GeometryError;

    fn try_from(record: PrintSpecRecord) -> std::result::Result<Self, Self::Error> {
        let page_count = page_count_from_number(&record.page_count)?;
        PrintSpec::new(
            TrimSize::Custom {
                width_in: record.trim_width_in,
                height_in: record.trim_height_in,
            },
            page_count,
            record.paper,
            record.include_bleed,
        )
    }
}

#[cfg(feature = "serde")]
impl From<PrintSpec> for PrintSpecRecord {
    fn from(spec: PrintSpec) -> Self {
        Self {
            trim_width_in: spec.trim_width_in,
            trim_height_in: spec.trim_height_in,
            page_count: spec.page_count.into(),
            paper: spec.paper,
            include_bleed: spec.include_bleed,
        }
    }
}

/// Physical size of one interior page in inches (width, height).
///
/// With bleed, KDP adds 0.125" to the outer edge and to top and bottom.
pub fn page_size(spec: &PrintSpec) -> (f64, f64) {
    if spec.include_bleed {
        (
            spec.trim_width_in + BLEED_IN,
            spec.trim_height_in + 2.0 * BLEED_IN,
        )
    } else {
        (spec.trim_width_in, spec.trim_height_in)
    }
}

/// Rectangle in inches, origin at the bottom-left of the physical page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_in: f64,
    pub y_in: f64,
    pub width_in: f64,
    pub height_in: f64,
}

/// Safe area of the page at `page_index` after margins.
///
/// Index 0 is a recto (right-hand page): its binding edge is on the left.
/// Bleed only ever extends the outer, top and bottom edges.
pub fn content_box(spec: &PrintSpec, page_index: u32) -> Rect {
    let margins = spec.margins();
    let bleed = if spec.include_bleed { BLEED_IN } else { 0.0 };
    let recto = page_index % 2 == 0;

    // Verso pages have their outer edge (and its bleed) on the left
    let x_in = if recto {
        margins.inner_in
    } else {
        bleed + margins.outer_in
    };

    Rect {
        x_in,
        y_in: bleed + margins.bottom_in,
        width_in: spec.trim_width_in - margins.inner_in - margins.outer_in,
        height_in: spec.trim_height_in - margins.top_in - margins.bottom_in,
    }
}

/// Full paperback cover spread: back panel, spine, front panel, with bleed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverWrap {
    pub width_in: f64,
    pub height_in: f64,
    pub spine_width_in: f64,
    /// Left edge of the spine
    pub spine_x_in: f64,
    /// Left edge of the front panel
    pub front_x_in: f64,
    pub bleed_in: f64,
}

impl CoverWrap {
    /// KDP only allows spine text on spines at least 0.0625" wide
    pub fn allows_spine_text(&self) -> bool {
        self.spine_width_in >= MIN_SPINE_TEXT_WIDTH_IN
    }
}

/// Cover spread geometry; covers always carry bleed
pub fn cover_wrap_size(spec: &PrintSpec) -> CoverWrap {
    let spine_width_in = spec.spine_width_in();
    let spine_x_in = BLEED_IN + spec.trim_width_in;
    let front_x_in = spine_x_in + spine_width_in;

    CoverWrap {
        width_in: round4(front_x_in + spec.trim_width_in + BLEED_IN),
        height_in: spec.trim_height_in + 2.0 * BLEED_IN,
        spine_width_in,
        spine_x_in,
        front_x_in,
        bleed_in: BLEED_IN,
    }
}

/// Front cover as a standalone page (trim plus bleed on every edge)
pub fn cover_front_size(spec: &PrintSpec) -> (f64, f64) {
    (
        spec.trim_width_in + 2.0 * BLEED_IN,
        spec.trim_height_in + 2.0 * BLEED_IN,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round4_keeps_exact_values() {
        assert_eq!(round4(0.22999999999999998), 0.23);
        assert_eq!(round4(0.0345), 0.0345);
    }

    #[test]
    fn verso_box_is_shifted_by_bleed() {
        let spec = PrintSpec::new(TrimSize::Letter, 24, PaperTint::White, true).unwrap();
        let recto = content_box(&spec, 0);
        let verso = content_box(&spec, 1);
        assert_eq!(recto.x_in, 0.375);
        assert_eq!(verso.x_in, 0.125 + 0.25);
        assert_eq!(recto.width_in, verso.width_in);
    }
}
