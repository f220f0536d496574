//! Per-run integration summary.
//!
//! Every integration run emits exactly one report, even when sources were
//! unavailable: the report is what records which cells are simulated, so a
//! table without one would be untraceable.

use crate::types::source::SourceVariant;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;

/// Collection and simulation statistics for one source variant.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub source: String,
    /// Tidy (district, date, metric) cells backed by real observations.
    pub real_cells: usize,
    /// Tidy cells produced by the fallback generator.
    pub simulated_cells: usize,
    /// Dates that had at least one uncovered district before fallback.
    pub missing_dates: Vec<NaiveDate>,
    /// Districts that had at least one uncovered date before fallback.
    pub missing_districts: Vec<String>,
    /// Why the source produced nothing, when it was fully unavailable.
    pub unavailable_reason: Option<String>,
}

impl SourceStats {
    pub(crate) fn new(variant: SourceVariant) -> Self {
        Self {
            source: variant.prefix().to_string(),
            real_cells: 0,
            simulated_cells: 0,
            missing_dates: Vec::new(),
            missing_districts: Vec::new(),
            unavailable_reason: None,
        }
    }

    /// Fraction of this source's cells that are simulated, in `[0, 1]`.
    /// A source with no cells at all reports 0.0.
    pub fn simulated_fraction(&self) -> f64 {
        let total = self.real_cells + self.simulated_cells;
        if total == 0 {
            0.0
        } else {
            self.simulated_cells as f64 / total as f64
        }
    }
}

/// Value object summarizing one integration run. Created once per run,
/// serialized or rendered, then discarded.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    pub districts_requested: usize,
    pub days_requested: i64,
    pub sources: Vec<SourceStats>,
    /// Raw records dropped because their district identifier did not resolve.
    pub skipped_records: usize,
    /// Primary rows whose district identifier could not be resolved; retained
    /// in the merged table with null feature columns.
    pub unmatched_primary_rows: usize,
    pub primary_rows: usize,
    pub merged_rows: usize,
    pub feature_columns: usize,
}

impl IntegrationReport {
    /// Stats for one source, if it was part of the run.
    pub fn source(&self, variant: SourceVariant) -> Option<&SourceStats> {
        self.sources.iter().find(|s| s.source == variant.prefix())
    }

    /// Renders the report as a Markdown summary.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Integration report\n");
        let _ = writeln!(
            out,
            "- districts requested: {}\n- days requested: {}\n- primary rows: {}\n- merged rows: {}\n- feature columns: {}\n- skipped records: {}\n- unmatched primary rows: {}\n",
            self.districts_requested,
            self.days_requested,
            self.primary_rows,
            self.merged_rows,
            self.feature_columns,
            self.skipped_records,
            self.unmatched_primary_rows,
        );
        let _ = writeln!(out, "## Sources\n");
        let _ = writeln!(out, "| source | real cells | simulated cells | simulated fraction | status |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for stats in &self.sources {
            let status = match &stats.unavailable_reason {
                Some(reason) => format!("unavailable: {reason}"),
                None if stats.missing_dates.is_empty() => "ok".to_string(),
                None => format!(
                    "partial ({} dates, {} districts affected)",
                    stats.missing_dates.len(),
                    stats.missing_districts.len()
                ),
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.3} | {} |",
                stats.source,
                stats.real_cells,
                stats.simulated_cells,
                stats.simulated_fraction(),
                status,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_one_for_fully_simulated_source() {
        let mut stats = SourceStats::new(SourceVariant::Mobility);
        stats.simulated_cells = 42;
        stats.unavailable_reason = Some("token not set".to_string());
        assert_eq!(stats.simulated_fraction(), 1.0);
    }

    #[test]
    fn fraction_is_zero_without_cells() {
        let stats = SourceStats::new(SourceVariant::Weather);
        assert_eq!(stats.simulated_fraction(), 0.0);
    }

    #[test]
    fn markdown_lists_every_source() {
        let report = IntegrationReport {
            districts_requested: 2,
            days_requested: 2,
            sources: vec![
                SourceStats::new(SourceVariant::Weather),
                SourceStats::new(SourceVariant::Mobility),
            ],
            skipped_records: 0,
            unmatched_primary_rows: 1,
            primary_rows: 4,
            merged_rows: 4,
            feature_columns: 20,
        };
        let markdown = report.to_markdown();
        assert!(markdown.contains("| weather |"));
        assert!(markdown.contains("| mobility |"));
        assert!(markdown.contains("unmatched primary rows: 1"));
    }
}
