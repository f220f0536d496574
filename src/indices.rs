//! Composite district indices derived from the merged table.
//!
//! Every index is a weighted blend of min-max normalized feature columns, so
//! all indices land in `[0, 1]` and are comparable across districts. Nulls in
//! any input propagate to the index for that row rather than being imputed. An
//! index whose inputs are absent from the table is skipped with a warning, not
//! an error: a primary dataset without an income column still deserves its
//! sustainability index.

use log::warn;
use polars::frame::DataFrame;
use polars::prelude::{col, lit, Expr, IntoLazy, PolarsError};

/// Column names the index pass reads from the primary dataset.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Energy consumption column used for the efficiency index.
    pub consumption_column: String,
    /// Per-capita income column used for the quality-of-life index.
    pub income_column: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            consumption_column: "consumption_kwh".to_string(),
            income_column: "income_per_capita".to_string(),
        }
    }
}

/// Computes the composite indices over a merged table.
pub(crate) struct IndexCalculator<'a> {
    config: &'a IndexConfig,
}

/// Min-max normalization of a column over the whole table.
fn minmax(column: &str) -> Expr {
    (col(column) - col(column).min()) / (col(column).max() - col(column).min())
}

impl<'a> IndexCalculator<'a> {
    pub(crate) fn new(config: &'a IndexConfig) -> Self {
        Self { config }
    }

    fn has(&self, frame: &DataFrame, columns: &[&str], index: &str) -> bool {
        for column in columns {
            if frame.column(column).is_err() {
                warn!("skipping {index}: input column '{column}' not present");
                return false;
            }
        }
        true
    }

    /// Appends the index columns the table has inputs for.
    pub(crate) fn compute(&self, frame: DataFrame) -> Result<DataFrame, PolarsError> {
        let mut lazy = frame.clone().lazy();

        // Sustainability: clean air dominates, tempered by heat and NO2 load.
        let sustainability_inputs =
            ["air_quality_aqi", "weather_temp_mean", "air_quality_no2"];
        let has_sustainability = self.has(&frame, &sustainability_inputs, "sustainability_index");
        if has_sustainability {
            lazy = lazy.with_columns([((lit(1.0) - minmax("air_quality_aqi")) * lit(0.5)
                + (lit(1.0) - minmax("weather_temp_mean")) * lit(0.25)
                + (lit(1.0) - minmax("air_quality_no2")) * lit(0.25))
            .alias("sustainability_index")]);
        }

        // Efficiency: consumption bought per euro of electricity, normalized.
        if self.has(
            &frame,
            &[self.config.consumption_column.as_str(), "electricity_price"],
            "energy_efficiency_index",
        ) {
            lazy = lazy
                .with_columns([(col(self.config.consumption_column.as_str())
                    / col("electricity_price"))
                .alias("energy_consumption_price_ratio")])
                .with_columns([minmax("energy_consumption_price_ratio")
                    .alias("energy_efficiency_index")]);
        }

        // Accessibility: transit reach and network connectivity, evenly split.
        let has_accessibility = self.has(
            &frame,
            &["mobility_accessibility", "mobility_connectivity"],
            "urban_accessibility_index",
        );
        if has_accessibility {
            lazy = lazy.with_columns([(minmax("mobility_accessibility") * lit(0.5)
                + minmax("mobility_connectivity") * lit(0.5))
            .alias("urban_accessibility_index")]);
        }

        // Quality of life blends the other two indices with income.
        if has_sustainability
            && has_accessibility
            && self.has(
                &frame,
                &[self.config.income_column.as_str()],
                "quality_of_life_index",
            )
        {
            lazy = lazy.with_columns([(col("sustainability_index") * lit(0.4)
                + col("urban_accessibility_index") * lit(0.3)
                + minmax(self.config.income_column.as_str()) * lit(0.3))
            .alias("quality_of_life_index")]);
        }

        lazy.collect()
    }
}
