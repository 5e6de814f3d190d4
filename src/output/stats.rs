//! Statistics reporting
//!
//! This module provides the per-query hit-rate report printed by `--stats`
//! and the summary a discovery run returns.

use crate::storage::StatsTable;
use std::fmt;

/// One row of the query report
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub query: String,
    pub valid: u64,
    pub total: u64,
    pub hit_rate: f64,
}

/// Historical performance of every query, best first
#[derive(Debug, Clone, Default)]
pub struct QueryReport {
    pub rows: Vec<QueryRow>,

    /// Sum of accepted items across all queries
    pub total_valid: u64,

    /// Sum of attempted items across all queries
    pub total_attempted: u64,
}

impl QueryReport {
    /// Builds the report from a statistics table
    ///
    /// Rows are sorted by descending hit rate; equal rates fall back to
    /// alphabetical query order so the output is stable.
    pub fn from_table(table: &StatsTable) -> Self {
        let mut rows: Vec<QueryRow> = table
            .entries()
            .map(|(query, stats)| QueryRow {
                query: query.clone(),
                valid: stats.valid,
                total: stats.total,
                hit_rate: stats.hit_rate(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.hit_rate
                .total_cmp(&a.hit_rate)
                .then_with(|| a.query.cmp(&b.query))
        });

        let total_valid = rows.iter().map(|r| r.valid).sum();
        let total_attempted = rows.iter().map(|r| r.total).sum();

        Self {
            rows,
            total_valid,
            total_attempted,
        }
    }

    pub fn overall_hit_rate(&self) -> f64 {
        self.total_valid as f64 / self.total_attempted.max(1) as f64
    }
}

/// Prints the query report to stdout
pub fn print_report(report: &QueryReport) {
    println!("=== Query Statistics ===\n");

    if report.rows.is_empty() {
        println!("No queries recorded yet.");
        return;
    }

    println!("{:>8} {:>8} {:>9}  Query", "Valid", "Total", "Hit rate");
    for row in &report.rows {
        println!(
            "{:>8} {:>8} {:>8.1}%  {}",
            row.valid,
            row.total,
            row.hit_rate * 100.0,
            row.query
        );
    }
    println!();

    println!(
        "Overall: {} / {} items accepted ({:.1}%) across {} queries",
        report.total_valid,
        report.total_attempted,
        report.overall_hit_rate() * 100.0,
        report.rows.len()
    );
}

/// Counters describing one discovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub queries_run: u64,

    /// Queries whose pagination ended on a search error
    pub queries_failed: u64,

    pub pages_fetched: u64,

    /// Search items seen, before any deduplication
    pub candidates_seen: u64,

    /// Candidates dropped by URL or content fingerprint
    pub duplicates_skipped: u64,

    pub fetch_failures: u64,
    pub validation_failures: u64,

    /// Artifacts written this run
    pub accepted: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queries ({} failed), {} pages, {} candidates: {} accepted, \
             {} duplicates, {} fetch failures, {} invalid",
            self.queries_run,
            self.queries_failed,
            self.pages_fetched,
            self.candidates_seen,
            self.accepted,
            self.duplicates_skipped,
            self.fetch_failures,
            self.validation_failures
        )
    }
}
