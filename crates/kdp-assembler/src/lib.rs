//! PDF assembly for print-ready books
//!
//! Turns a validated [`kdp_layout::BookPlan`] plus resolved page content into
//! interior, front cover and cover wrap PDFs sized from the plan's geometry.

mod canvas;
mod cover;
mod inspect;
mod interior;
mod options;
mod types;

pub use cover::{
    assemble_cover_front, assemble_cover_front_bytes, assemble_cover_wrap,
    assemble_cover_wrap_bytes,
};
pub use inspect::{PdfSummary, inspect_pdf};
pub use interior::{assemble_interior, assemble_interior_bytes, placeholder_text};
pub use options::AssemblerOptions;
pub use types::*;
