//! Tidy-to-wide pivoting.
//!
//! The feature table carries one row per (district, date) over the full
//! cartesian product of the request. Cells no record covers stay null; nothing
//! is fabricated here (fallback coverage happens upstream) and no row is ever
//! dropped for being empty.

use crate::districts::District;
use crate::types::date_range::DateRange;
use crate::types::record::TidyRecord;
use crate::types::source::SourceVariant;
use chrono::NaiveDate;
use polars::error::PolarsError;
use polars::frame::DataFrame;
use polars::prelude::Column;
use std::collections::HashMap;

/// Pivots tidy records into the wide feature table.
///
/// Columns: `district_code`, `district`, `date`, one `{variant}_{metric}`
/// column per declared metric, and one `{variant}_simulated_fraction` column
/// per variant (fraction of that variant's cells in the row that are
/// simulated; null when the variant covered nothing in the row).
pub(crate) fn pivot_feature_table(
    records: &[TidyRecord],
    range: DateRange,
    districts: &[District],
) -> Result<DataFrame, PolarsError> {
    let mut rows: Vec<(District, NaiveDate)> = districts
        .iter()
        .flat_map(|&d| range.iter_days().map(move |day| (d, day)))
        .collect();
    rows.sort_by_key(|&(d, day)| (d.code(), day));

    let row_index: HashMap<(u8, NaiveDate), usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, &(d, day))| ((d.code(), day), idx))
        .collect();

    // Metric columns, keyed by wide column name.
    let mut values: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    for variant in SourceVariant::ALL {
        for spec in variant.metrics() {
            values.insert(variant.column_name(spec.name), vec![None; rows.len()]);
        }
    }

    // Per (row, variant) simulated/total cell counts.
    let mut simulated_counts: HashMap<(usize, SourceVariant), (usize, usize)> = HashMap::new();

    for record in records {
        let Some(&idx) = row_index.get(&(record.district.code(), record.date)) else {
            // Outside the requested product; the engine never produces these.
            continue;
        };
        let column = record.variant.column_name(&record.metric);
        if let Some(cells) = values.get_mut(&column) {
            cells[idx] = Some(record.value);
        }
        let (simulated, total) = simulated_counts.entry((idx, record.variant)).or_insert((0, 0));
        *total += 1;
        if record.simulated {
            *simulated += 1;
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::new(
        "district_code".into(),
        rows.iter().map(|(d, _)| d.code_str()).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "district".into(),
        rows.iter().map(|(d, _)| d.name().to_string()).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "date".into(),
        rows.iter()
            .map(|(_, day)| day.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>(),
    ));

    for variant in SourceVariant::ALL {
        for spec in variant.metrics() {
            let name = variant.column_name(spec.name);
            let cells = values.remove(&name).unwrap_or_else(|| vec![None; rows.len()]);
            columns.push(Column::new(name.as_str().into(), cells));
        }
        let fractions: Vec<Option<f64>> = (0..rows.len())
            .map(|idx| {
                simulated_counts
                    .get(&(idx, variant))
                    .map(|&(simulated, total)| simulated as f64 / total as f64)
            })
            .collect();
        columns.push(Column::new(
            variant.simulated_fraction_column().as_str().into(),
            fractions,
        ));
    }

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::DistrictRegistry;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn tidy(
        district: District,
        date: NaiveDate,
        variant: SourceVariant,
        metric: &str,
        value: f64,
        simulated: bool,
    ) -> TidyRecord {
        TidyRecord {
            district,
            date,
            metric: metric.to_string(),
            value,
            variant,
            simulated,
        }
    }

    #[test]
    fn rows_cover_the_full_product_even_without_records() {
        let registry = DistrictRegistry::new();
        let districts = vec![
            registry.resolve("Centro").unwrap(),
            registry.resolve("Salamanca").unwrap(),
        ];
        let range = DateRange::new(day(1), day(3)).unwrap();

        let table = pivot_feature_table(&[], range, &districts).unwrap();
        assert_eq!(table.height(), 6);

        // Every metric cell is null.
        let column = table.column("weather_temp_mean").unwrap();
        assert_eq!(column.null_count(), 6);
    }

    #[test]
    fn cell_lands_at_its_district_and_date() {
        let registry = DistrictRegistry::new();
        let centro = registry.resolve("Centro").unwrap();
        let salamanca = registry.resolve("Salamanca").unwrap();
        let districts = vec![centro, salamanca];
        let range = DateRange::new(day(1), day(2)).unwrap();

        let records = vec![
            tidy(salamanca, day(2), SourceVariant::Weather, "temp_mean", 15.0, false),
        ];
        let table = pivot_feature_table(&records, range, &districts).unwrap();

        // Rows sorted by (code, date): Centro d1, Centro d2, Salamanca d1, Salamanca d2.
        let column = table.column("weather_temp_mean").unwrap();
        let values: Vec<Option<f64>> = column.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![None, None, None, Some(15.0)]);
    }

    #[test]
    fn simulated_fraction_mixes_real_and_simulated_cells() {
        let registry = DistrictRegistry::new();
        let centro = registry.resolve("Centro").unwrap();
        let districts = vec![centro];
        let range = DateRange::single(day(1));

        let records = vec![
            tidy(centro, day(1), SourceVariant::Weather, "temp_mean", 15.0, false),
            tidy(centro, day(1), SourceVariant::Weather, "humidity", 50.0, true),
        ];
        let table = pivot_feature_table(&records, range, &districts).unwrap();

        let fractions = table
            .column("weather_simulated_fraction")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(fractions.get(0), Some(0.5));

        // No mobility records: fraction is null, not zero.
        let mobility = table
            .column("mobility_simulated_fraction")
            .unwrap();
        assert_eq!(mobility.null_count(), 1);
    }

    #[test]
    fn key_columns_use_padded_codes_and_iso_dates() {
        let registry = DistrictRegistry::new();
        let districts = vec![registry.resolve("Centro").unwrap()];
        let range = DateRange::single(day(5));

        let table = pivot_feature_table(&[], range, &districts).unwrap();
        let codes = table.column("district_code").unwrap().str().unwrap();
        let dates = table.column("date").unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("01"));
        assert_eq!(dates.get(0), Some("2024-03-05"));
    }
}
