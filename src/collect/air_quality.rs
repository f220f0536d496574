//! Air quality collector backed by the Madrid open-data portal.
//!
//! The portal publishes one semicolon-separated CSV per year with one row per
//! (station, pollutant, month) and paired day/validity columns D01/V01..D31/V31.
//! Stations map onto districts through a fixed table; districts with several
//! stations get several records per cell and the normalizer averages them.

use crate::collect::{classify, SourceCollector};
use crate::districts::District;
use crate::types::collection::CollectionResult;
use crate::types::date_range::DateRange;
use crate::types::record::RawRecord;
use crate::types::source::SourceVariant;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap, HashSet};

const DAILY_CSV_URL: &str =
    "https://datos.madrid.es/egob/catalogo/201200-10306609-calidad-aire-diario.csv";

/// Measurement network station number → district code. Only stations with an
/// unambiguous district assignment are listed; others are ignored.
const STATION_DISTRICTS: [(u32, u8); 18] = [
    (1, 1),
    (2, 1),
    (4, 1),
    (3, 2),
    (35, 2),
    (8, 3),
    (36, 3),
    (9, 4),
    (10, 5),
    (38, 5),
    (11, 7),
    (12, 9),
    (13, 12),
    (14, 13),
    (15, 15),
    (16, 16),
    (17, 17),
    (18, 20),
];

/// Pollutant magnitude codes used by the portal.
fn magnitude_metric(code: u32) -> Option<&'static str> {
    match code {
        1 => Some("so2"),
        6 => Some("co"),
        8 => Some("no2"),
        9 => Some("pm25"),
        10 => Some("pm10"),
        14 => Some("o3"),
        _ => None,
    }
}

/// "Good" thresholds per pollutant (µg/m³, CO in mg/m³), scaled so a value at
/// the threshold scores 50. Higher AQI is worse.
fn aqi_component(metric: &str, value: f64) -> Option<f64> {
    let good = match metric {
        "no2" => 40.0,
        "pm10" => 20.0,
        "pm25" => 10.0,
        "o3" => 120.0,
        "so2" => 125.0,
        "co" => 2.0,
        _ => return None,
    };
    Some(value / good * 50.0)
}

pub struct AirQualityCollector {
    client: Client,
    csv_url: String,
}

impl AirQualityCollector {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            csv_url: DAILY_CSV_URL.to_string(),
        }
    }

    /// Points the collector at an alternative CSV location (mirrors, fixtures).
    pub fn with_csv_url(csv_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            csv_url: csv_url.into(),
        }
    }

    async fn download_csv(&self) -> Result<String, String> {
        info!("downloading air quality CSV from {}", self.csv_url);
        let response = self
            .client
            .get(&self.csv_url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("http status: {e}"))?;
        response
            .text()
            .await
            .map_err(|e| format!("body read failed: {e}"))
    }
}

impl Default for AirQualityCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the portal's daily CSV into raw pollutant records for the requested
/// districts and range, then derives one `aqi` record per covered
/// (district, station, day) as the worst pollutant component.
fn parse_daily_csv(
    body: &str,
    range: DateRange,
    districts: &[District],
) -> Vec<RawRecord> {
    let station_map: HashMap<u32, u8> = STATION_DISTRICTS.iter().copied().collect();
    let wanted: HashMap<u8, District> =
        districts.iter().map(|&d| (d.code(), d)).collect();

    // (station, date) → metric → value, kept ordered for deterministic output.
    let mut by_cell: BTreeMap<(u32, NaiveDate), Vec<(&'static str, f64, District)>> =
        BTreeMap::new();

    for line in body.lines().skip(1) {
        let fields: Vec<&str> = line.split(';').collect();
        // PROVINCIA;MUNICIPIO;ESTACION;MAGNITUD;PUNTO_MUESTREO;ANO;MES;D01;V01;..
        if fields.len() < 9 {
            continue;
        }
        let Ok(station) = fields[2].trim().parse::<u32>() else {
            continue;
        };
        let Some(&district_code) = station_map.get(&station) else {
            continue;
        };
        let Some(&district) = wanted.get(&district_code) else {
            continue;
        };
        let Some(metric) = fields[3].trim().parse::<u32>().ok().and_then(magnitude_metric)
        else {
            continue;
        };
        let (Ok(year), Ok(month)) = (
            fields[5].trim().parse::<i32>(),
            fields[6].trim().parse::<u32>(),
        ) else {
            continue;
        };

        for day in 1..=31u32 {
            let value_idx = 7 + 2 * (day as usize - 1);
            let valid_idx = value_idx + 1;
            if valid_idx >= fields.len() {
                break;
            }
            // Only validated measurements count; "N" rows are instrument gaps.
            if fields[valid_idx].trim() != "V" {
                continue;
            }
            let Ok(value) = fields[value_idx].trim().parse::<f64>() else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            if !range.contains(date) {
                continue;
            }
            by_cell
                .entry((station, date))
                .or_default()
                .push((metric, value, district));
        }
    }

    let mut records = Vec::new();
    for ((_, date), measurements) in by_cell {
        let Some(timestamp) = date.and_hms_opt(12, 0, 0) else {
            continue;
        };
        let mut worst_component: Option<f64> = None;
        let mut district = None;
        for &(metric, value, d) in &measurements {
            district = Some(d);
            records.push(RawRecord::observed(
                SourceVariant::AirQuality,
                d.name(),
                timestamp,
                metric,
                value,
            ));
            if let Some(component) = aqi_component(metric, value) {
                worst_component =
                    Some(worst_component.map_or(component, |w: f64| w.max(component)));
            }
        }
        if let (Some(aqi), Some(district)) = (worst_component, district) {
            records.push(RawRecord::observed(
                SourceVariant::AirQuality,
                district.name(),
                timestamp,
                "aqi",
                aqi,
            ));
        }
    }
    records
}

/// (district, date) cells of the request that no station covered.
fn uncovered_cells(
    records: &[RawRecord],
    range: DateRange,
    districts: &[District],
) -> Vec<(District, NaiveDate)> {
    let covered: HashSet<(String, NaiveDate)> = records
        .iter()
        .map(|r| (r.district.clone(), r.timestamp.date()))
        .collect();
    districts
        .iter()
        .flat_map(|&d| range.iter_days().map(move |day| (d, day)))
        .filter(|(d, day)| !covered.contains(&(d.name().to_string(), *day)))
        .collect()
}

#[async_trait]
impl SourceCollector for AirQualityCollector {
    fn variant(&self) -> SourceVariant {
        SourceVariant::AirQuality
    }

    async fn fetch(&self, range: DateRange, districts: &[District]) -> CollectionResult {
        let body = match self.download_csv().await {
            Ok(body) => body,
            Err(reason) => {
                warn!("air quality download failed: {reason}");
                return CollectionResult::Unavailable(reason);
            }
        };

        let records = parse_daily_csv(&body, range, districts);
        let missing = uncovered_cells(&records, range, districts);
        classify(records, missing, "air quality CSV contained no usable rows")
    }
}
