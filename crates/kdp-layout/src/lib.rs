pub mod constants;
mod geometry;
mod import;
mod plan;
mod stats;
mod types;

pub use geometry::*;
pub use import::load_pages_from_csv;
pub use plan::*;
pub use stats::{PlanStatistics, calculate_statistics};
pub use types::*;
