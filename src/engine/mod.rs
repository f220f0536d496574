//! The integration engine: orchestrates collection, normalization, fallback,
//! pivoting, merging and index computation for one run.
//!
//! A run never fails because a source is down. Collectors report their own
//! failure modes through [`CollectionResult`]; the engine fills whatever
//! coverage is missing with deterministic simulated records and accounts for
//! every simulated cell in the [`IntegrationReport`]. The only fatal errors
//! are configuration defects: an unresolvable requested district, a missing
//! key column in the primary dataset, or a metric without an aggregation
//! policy.

pub mod error;
pub mod report;

mod merge;
mod pivot;

use crate::collect::SourceCollector;
use crate::districts::{District, DistrictRegistry};
use crate::fallback::FallbackGenerator;
use crate::indices::{IndexCalculator, IndexConfig};
use crate::normalize::RecordNormalizer;
use crate::types::collection::CollectionResult;
use crate::types::date_range::DateRange;
use crate::types::record::TidyRecord;
use bon::bon;
use chrono::NaiveDate;
use error::IntegrationError;
use futures_util::future::join_all;
use log::{info, warn};
use polars::frame::DataFrame;
use report::{IntegrationReport, SourceStats};
use std::collections::BTreeSet;
use std::time::Duration;

const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of one integration run: the merged table plus its provenance.
#[derive(Debug)]
pub struct Integration {
    pub table: DataFrame,
    pub report: IntegrationReport,
}

/// Multi-source integration engine for Madrid district data.
///
/// Construction uses a builder; only the collector set is required.
///
/// # Examples
///
/// ```no_run
/// use chrono::NaiveDate;
/// use distrito::{
///     AirQualityCollector, DateRange, ElectricityPriceCollector, IntegrationEngine,
///     MobilityCollector, SourceCollector, WeatherCollector,
/// };
/// use polars::df;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = IntegrationEngine::builder()
///     .collectors(vec![
///         Box::new(WeatherCollector::from_env()) as Box<dyn SourceCollector>,
///         Box::new(AirQualityCollector::new()),
///         Box::new(MobilityCollector::from_env()),
///         Box::new(ElectricityPriceCollector::new()),
///     ])
///     .build();
///
/// let primary = df!(
///     "distrito" => ["Centro"],
///     "fecha" => ["2024-03-01"],
///     "consumption_kwh" => [310.0],
/// )?;
/// let range = DateRange::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
///
/// let integration = engine
///     .integrate()
///     .primary(primary)
///     .range(range)
///     .call()
///     .await?;
/// println!("{}", integration.report.to_markdown());
/// # Ok(())
/// # }
/// ```
pub struct IntegrationEngine {
    registry: DistrictRegistry,
    collectors: Vec<Box<dyn SourceCollector>>,
    fallback: FallbackGenerator,
    collector_timeout: Duration,
    primary_district_column: String,
    primary_date_column: String,
    index_config: IndexConfig,
}

#[bon]
impl IntegrationEngine {
    /// Creates an engine over a set of collectors.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.collectors(Vec<Box<dyn SourceCollector>>)`: **Required.** One collector per source to integrate.
    /// * `.collector_timeout(Duration)`: Optional. Per-collector fetch deadline. Defaults to 60 seconds.
    /// * `.primary_district_column(String)`: Optional. District column in the primary dataset. Defaults to `"distrito"`.
    /// * `.primary_date_column(String)`: Optional. Date column in the primary dataset. Defaults to `"fecha"`.
    /// * `.index_config(IndexConfig)`: Optional. Primary column names feeding the composite indices.
    #[builder]
    pub fn new(
        collectors: Vec<Box<dyn SourceCollector>>,
        collector_timeout: Option<Duration>,
        primary_district_column: Option<String>,
        primary_date_column: Option<String>,
        index_config: Option<IndexConfig>,
    ) -> Self {
        Self {
            registry: DistrictRegistry::new(),
            collectors,
            fallback: FallbackGenerator::new(),
            collector_timeout: collector_timeout.unwrap_or(DEFAULT_COLLECTOR_TIMEOUT),
            primary_district_column: primary_district_column
                .unwrap_or_else(|| "distrito".to_string()),
            primary_date_column: primary_date_column.unwrap_or_else(|| "fecha".to_string()),
            index_config: index_config.unwrap_or_default(),
        }
    }

    /// Runs one integration: fetch, normalize, fill, pivot, merge, index.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.primary(DataFrame)`: **Required.** The primary dataset to enrich.
    /// * `.range(DateRange)`: **Required.** The calendar days to cover.
    /// * `.districts(Vec<String>)`: Optional. District names or codes to cover. Defaults to all 21 districts.
    #[builder]
    pub async fn integrate(
        &self,
        primary: DataFrame,
        range: DateRange,
        districts: Option<Vec<String>>,
    ) -> Result<Integration, IntegrationError> {
        // Resolve the request before any fetching: a bad district name must
        // not waste a multi-source run.
        let districts: Vec<District> = match districts {
            Some(identifiers) => identifiers
                .iter()
                .map(|identifier| self.registry.resolve(identifier))
                .collect::<Result<_, _>>()?,
            None => self.registry.all().to_vec(),
        };

        info!(
            "integrating {} sources over {} districts x {} days",
            self.collectors.len(),
            districts.len(),
            range.num_days()
        );

        let fetches = self.collectors.iter().map(|collector| {
            let districts = &districts;
            async move {
                let result =
                    match tokio::time::timeout(self.collector_timeout, collector.fetch(range, districts))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => CollectionResult::Unavailable(format!(
                            "fetch exceeded {}s deadline",
                            self.collector_timeout.as_secs()
                        )),
                    };
                (collector.variant(), result)
            }
        });
        let results = join_all(fetches).await;

        let normalizer = RecordNormalizer::new(&self.registry);
        let mut tidy: Vec<TidyRecord> = Vec::new();
        let mut sources = Vec::with_capacity(results.len());
        let mut skipped_records = 0usize;

        for (variant, result) in results {
            let mut stats = SourceStats::new(variant);
            if let CollectionResult::Unavailable(reason) = &result {
                warn!("{variant} unavailable, falling back to simulation: {reason}");
                stats.unavailable_reason = Some(reason.clone());
            }

            let outcome = normalizer.normalize(result.records())?;
            skipped_records += outcome.skipped;
            stats.real_cells = outcome.records.len();

            // Coverage is judged on the normalized output, not on what the
            // collector claims: a record skipped for a bad district is a gap.
            let covered: BTreeSet<(u8, NaiveDate)> = outcome
                .records
                .iter()
                .map(|record| (record.district.code(), record.date))
                .collect();
            let missing: Vec<(District, NaiveDate)> = districts
                .iter()
                .flat_map(|&district| range.iter_days().map(move |day| (district, day)))
                .filter(|(district, day)| !covered.contains(&(district.code(), *day)))
                .collect();

            stats.missing_dates = missing
                .iter()
                .map(|&(_, day)| day)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            stats.missing_districts = missing
                .iter()
                .map(|&(district, _)| district.name().to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            tidy.extend(outcome.records);

            if !missing.is_empty() {
                info!(
                    "{variant}: filling {} missing cells with simulated records",
                    missing.len()
                );
                let simulated = normalizer
                    .normalize(&self.fallback.generate_cells(variant, &missing))?;
                stats.simulated_cells = simulated.records.len();
                tidy.extend(simulated.records);
            }

            sources.push(stats);
        }

        let features = pivot::pivot_feature_table(&tidy, range, &districts)?;
        // Everything past the three key columns is a feature.
        let feature_columns = features.width().saturating_sub(3);

        let primary_rows = primary.height();
        let merged = merge::left_merge_primary(
            &primary,
            features,
            &self.registry,
            &self.primary_district_column,
            &self.primary_date_column,
        )?;

        let table = IndexCalculator::new(&self.index_config).compute(merged.frame)?;

        let report = IntegrationReport {
            districts_requested: districts.len(),
            days_requested: range.num_days(),
            sources,
            skipped_records,
            unmatched_primary_rows: merged.unmatched_primary_rows,
            primary_rows,
            merged_rows: table.height(),
            feature_columns,
        };

        Ok(Integration { table, report })
    }
}
