//! Shared constants for KDP print geometry
//!
//! This module centralizes the print-on-demand numbers used throughout
//! geometry and plan validation. Every length is in inches.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch (PDF user space)
pub const POINTS_PER_INCH: f64 = 72.0;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Convert inches to points
#[inline]
pub fn in_to_pt(inches: f64) -> f64 {
    inches * POINTS_PER_INCH
}

/// Convert points to inches
#[inline]
pub fn pt_to_in(pt: f64) -> f64 {
    pt / POINTS_PER_INCH
}

/// Convert inches to millimeters
#[inline]
pub fn in_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

// =============================================================================
// Page Count
// =============================================================================

/// Smallest printable paperback
pub const MIN_PAGE_COUNT: u32 = 24;

/// Largest printable paperback
pub const MAX_PAGE_COUNT: u32 = 828;

/// Pages that every plan reserves for COVER, SPINE and BACK
pub const STRUCTURAL_PAGES: u32 = 3;

// =============================================================================
// Margins
// =============================================================================

/// Top, bottom and outer margin
pub const BASE_MARGIN_IN: f64 = 0.25;

/// Inner (gutter) margin for books of up to 50 pages
pub const BASE_INNER_MARGIN_IN: f64 = 0.375;

/// Inner margin for books of more than 50 pages
pub const MEDIUM_INNER_MARGIN_IN: f64 = 0.4375;

/// Inner margin for books of more than 100 pages
pub const LARGE_INNER_MARGIN_IN: f64 = 0.5;

pub const MEDIUM_INNER_MARGIN_THRESHOLD: u32 = 50;
pub const LARGE_INNER_MARGIN_THRESHOLD: u32 = 100;

// =============================================================================
// Paper and Bleed
// =============================================================================

/// Thickness of one page of white paper
pub const WHITE_PAGE_THICKNESS_IN: f64 = 0.0023;

/// Thickness of one page of cream paper
pub const CREAM_PAGE_THICKNESS_IN: f64 = 0.0025;

/// Bleed added on each trimmed edge
pub const BLEED_IN: f64 = 0.125;

/// Spine text is only allowed on spines at least this wide
pub const MIN_SPINE_TEXT_WIDTH_IN: f64 = 0.0625;

// =============================================================================
// Trim Limits
// =============================================================================

pub const MIN_TRIM_WIDTH_IN: f64 = 4.0;
pub const MAX_TRIM_WIDTH_IN: f64 = 8.5;
pub const MIN_TRIM_HEIGHT_IN: f64 = 6.0;
pub const MAX_TRIM_HEIGHT_IN: f64 = 11.69;
