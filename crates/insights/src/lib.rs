pub mod filter;
pub mod markers;
pub mod stats;
pub mod status;

pub use filter::{CaseRow, CategoryFilter, filter_cases};
pub use markers::{MapMarker, map_markers};
pub use stats::{DashboardStats, INVOICES_PER_CASE, compute_stats};
pub use status::{StatusSeverity, classify_status};
