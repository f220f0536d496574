//! Persistence of integration results: the merged table as CSV and the
//! report as Markdown. Parent directories are created on demand.

use crate::engine::report::IntegrationReport;
use polars::error::PolarsError;
use polars::frame::DataFrame;
use polars::prelude::{CsvWriter, SerWriter};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write output file")]
    Io(#[from] io::Error),

    #[error("could not serialize dataframe")]
    Csv(#[from] PolarsError),
}

/// Writes the merged feature table as CSV.
pub fn save_feature_table(table: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(table)?;
    Ok(())
}

/// Writes the integration report as Markdown.
pub fn save_report(report: &IntegrationReport, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_markdown())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::SourceStats;
    use crate::types::source::SourceVariant;
    use polars::df;

    #[test]
    fn writes_csv_with_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("features.csv");

        let mut table = df!(
            "district_code" => ["01", "04"],
            "weather_temp_mean" => [14.0, 15.5],
        )
        .unwrap();
        save_feature_table(&mut table, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("district_code,weather_temp_mean"));
        assert!(written.contains("01,14.0"));
    }

    #[test]
    fn writes_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        let report = IntegrationReport {
            districts_requested: 1,
            days_requested: 1,
            sources: vec![SourceStats::new(SourceVariant::Weather)],
            skipped_records: 0,
            unmatched_primary_rows: 0,
            primary_rows: 1,
            merged_rows: 1,
            feature_columns: 10,
        };
        save_report(&report, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Integration report"));
        assert!(written.contains("| weather |"));
    }
}
