//! Source variants and the per-metric policy tables that drive aggregation
//! and fallback generation.
//!
//! Each of the four collector variants owns a closed metric vocabulary. For
//! every metric the table declares how sub-daily observations collapse onto a
//! calendar day and inside which plausible band a simulated value may fall.
//! Both are fixed policy, not free-form behavior: a metric missing from the
//! table is a configuration defect and aborts normalization.

use std::fmt;

/// The four kinds of external data source feeding the feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceVariant {
    Weather,
    AirQuality,
    Mobility,
    ElectricityPrice,
}

/// How multiple sub-daily observations of one metric collapse onto a single
/// (district, date) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateRule {
    /// Arithmetic mean, for intensities (temperature, humidity, pollutant
    /// concentrations, scores).
    Mean,
    /// Sum, for accumulations (precipitation, trip counts).
    Sum,
    /// Latest value by timestamp, for price snapshots.
    Last,
}

/// Plausible value band for simulated records of one metric.
///
/// Seasonal bands follow Madrid's climate: December-February is winter,
/// June-August is summer, everything else uses the shoulder band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallbackBand {
    Fixed { lo: f64, hi: f64 },
    Seasonal {
        winter: (f64, f64),
        summer: (f64, f64),
        shoulder: (f64, f64),
    },
}

impl FallbackBand {
    /// The (lo, hi) band applying to a given calendar month (1..=12).
    pub fn for_month(&self, month: u32) -> (f64, f64) {
        match *self {
            FallbackBand::Fixed { lo, hi } => (lo, hi),
            FallbackBand::Seasonal {
                winter,
                summer,
                shoulder,
            } => match month {
                12 | 1 | 2 => winter,
                6 | 7 | 8 => summer,
                _ => shoulder,
            },
        }
    }
}

/// Declared policy for one metric of one source variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub aggregate: AggregateRule,
    pub fallback: FallbackBand,
}

const fn fixed(name: &'static str, aggregate: AggregateRule, lo: f64, hi: f64) -> MetricSpec {
    MetricSpec {
        name,
        aggregate,
        fallback: FallbackBand::Fixed { lo, hi },
    }
}

const fn seasonal(
    name: &'static str,
    aggregate: AggregateRule,
    winter: (f64, f64),
    summer: (f64, f64),
    shoulder: (f64, f64),
) -> MetricSpec {
    MetricSpec {
        name,
        aggregate,
        fallback: FallbackBand::Seasonal {
            winter,
            summer,
            shoulder,
        },
    }
}

/// Madrid-plausible bands. Temperatures in °C, pollutants in µg/m³ (CO in
/// mg/m³), prices in €/kWh, wind in m/s, daily precipitation in mm.
const WEATHER_METRICS: [MetricSpec; 7] = [
    seasonal("temp_mean", AggregateRule::Mean, (2.0, 12.0), (20.0, 34.0), (10.0, 22.0)),
    seasonal("temp_min", AggregateRule::Mean, (-2.0, 8.0), (15.0, 24.0), (5.0, 14.0)),
    seasonal("temp_max", AggregateRule::Mean, (6.0, 16.0), (27.0, 40.0), (14.0, 27.0)),
    fixed("humidity", AggregateRule::Mean, 30.0, 85.0),
    fixed("pressure", AggregateRule::Mean, 1005.0, 1025.0),
    fixed("wind_speed", AggregateRule::Mean, 0.0, 12.0),
    fixed("precipitation", AggregateRule::Sum, 0.0, 8.0),
];

// Winter raises NO2/PM (heating + stagnant air), summer raises O3.
const AIR_QUALITY_METRICS: [MetricSpec; 7] = [
    seasonal("no2", AggregateRule::Mean, (30.0, 70.0), (15.0, 45.0), (20.0, 55.0)),
    seasonal("pm10", AggregateRule::Mean, (18.0, 45.0), (12.0, 35.0), (15.0, 40.0)),
    seasonal("pm25", AggregateRule::Mean, (10.0, 28.0), (7.0, 20.0), (8.0, 24.0)),
    seasonal("o3", AggregateRule::Mean, (25.0, 60.0), (60.0, 120.0), (40.0, 90.0)),
    fixed("so2", AggregateRule::Mean, 2.0, 12.0),
    fixed("co", AggregateRule::Mean, 0.2, 0.8),
    fixed("aqi", AggregateRule::Mean, 20.0, 90.0),
];

const MOBILITY_METRICS: [MetricSpec; 4] = [
    fixed("metro_trips", AggregateRule::Sum, 20_000.0, 180_000.0),
    fixed("bus_trips", AggregateRule::Sum, 15_000.0, 120_000.0),
    fixed("accessibility", AggregateRule::Mean, 0.6, 0.95),
    fixed("connectivity", AggregateRule::Mean, 40.0, 95.0),
];

const ELECTRICITY_METRICS: [MetricSpec; 2] = [
    seasonal("price", AggregateRule::Last, (0.10, 0.22), (0.09, 0.20), (0.07, 0.16)),
    seasonal("market_price", AggregateRule::Last, (0.09, 0.20), (0.08, 0.18), (0.06, 0.14)),
];

impl SourceVariant {
    /// All four variants, in the order the engine fetches them.
    pub const ALL: [SourceVariant; 4] = [
        SourceVariant::Weather,
        SourceVariant::AirQuality,
        SourceVariant::Mobility,
        SourceVariant::ElectricityPrice,
    ];

    /// Column prefix used in the wide feature table (`{prefix}_{metric}`).
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceVariant::Weather => "weather",
            SourceVariant::AirQuality => "air_quality",
            SourceVariant::Mobility => "mobility",
            SourceVariant::ElectricityPrice => "electricity",
        }
    }

    /// The variant's full metric vocabulary.
    pub fn metrics(&self) -> &'static [MetricSpec] {
        match self {
            SourceVariant::Weather => &WEATHER_METRICS,
            SourceVariant::AirQuality => &AIR_QUALITY_METRICS,
            SourceVariant::Mobility => &MOBILITY_METRICS,
            SourceVariant::ElectricityPrice => &ELECTRICITY_METRICS,
        }
    }

    /// Policy entry for a metric name, or `None` if the variant does not
    /// declare it.
    pub fn metric(&self, name: &str) -> Option<&'static MetricSpec> {
        self.metrics().iter().find(|m| m.name == name)
    }

    /// Wide-table column name for one of this variant's metrics.
    pub fn column_name(&self, metric: &str) -> String {
        format!("{}_{}", self.prefix(), metric)
    }

    /// Column carrying the per-row simulated fraction for this variant.
    pub fn simulated_fraction_column(&self) -> String {
        format!("{}_simulated_fraction", self.prefix())
    }

    /// Stable numeric tag mixed into fallback seeds. Must never change, or
    /// simulated values stop being reproducible across builds.
    pub(crate) fn seed_tag(&self) -> u64 {
        match self {
            SourceVariant::Weather => 1,
            SourceVariant::AirQuality => 2,
            SourceVariant::Mobility => 3,
            SourceVariant::ElectricityPrice => 4,
        }
    }
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
