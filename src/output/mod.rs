//! Output module for run summaries and query reports

pub mod stats;

pub use stats::{print_report, QueryReport, QueryRow, RunSummary};
