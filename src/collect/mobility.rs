//! Mobility collector backed by the EMT Madrid open API.
//!
//! Daily ridership comes from the API (token required); the per-district
//! accessibility and connectivity scores are infrastructure constants derived
//! from the transport network layout, emitted alongside the ridership so every
//! covered cell carries the full mobility vocabulary.

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
use std::time::Duration;

const RIDERSHIP_URL: &str = "https://openapi.emtmadrid.es/v2/transport/ridership";
const ACCESS_TOKEN_ENV: &str = "EMT_ACCESS_TOKEN";

/// Per-district infrastructure profile, indexed by code - 1:
/// (accessibility score 0..1, connectivity score 0..100).
const INFRASTRUCTURE: [(f64, f64); 21] = [
    (0.95, 92.0), // Centro
    (0.90, 78.0), // Arganzuela
    (0.88, 74.0), // Retiro
    (0.90, 82.0), // Salamanca
    (0.95, 88.0), // Chamartín
    (0.85, 76.0), // Tetuán
    (0.90, 84.0), // Chamberí
    (0.80, 58.0), // Fuencarral-El Pardo
    (0.88, 72.0), // Moncloa-Aravaca
    (0.82, 64.0), // Latina
    (0.84, 68.0), // Carabanchel
    (0.82, 62.0), // Usera
    (0.85, 70.0), // Puente de Vallecas
    (0.80, 56.0), // Moratalaz
    (0.86, 72.0), // Ciudad Lineal
    (0.82, 60.0), // Hortaleza
    (0.78, 52.0), // Villaverde
    (0.75, 48.0), // Villa de Vallecas
    (0.72, 44.0), // Vicálvaro
    (0.80, 58.0), // San Blas-Canillejas
    (0.76, 54.0), // Barajas
];

pub struct MobilityCollector {
    client: Client,
    access_token: Option<String>,
    pace: Duration,
}

impl MobilityCollector {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            access_token,
            pace: Duration::from_millis(250),
        }
    }

    /// Reads the access token from `EMT_ACCESS_TOKEN`, if set.
    pub fn from_env() -> Self {
        Self::new(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    async fn fetch_day(&self, token: &str, day: NaiveDate) -> Result<serde_json::Value, String> {
        let url = format!("{RIDERSHIP_URL}/{day}");
        let response = self
            .client
            .get(&url)
            .header("accessToken", token)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("http status: {e}"))?;
        response
            .json()
            .await
            .map_err(|e| format!("invalid json: {e}"))
    }
}

/// Extracts per-district trip counts from one day's ridership payload and
/// attaches the static infrastructure scores for each covered district.
fn parse_ridership(
    body: &serde_json::Value,
    day: NaiveDate,
    districts: &[District],
) -> Vec<RawRecord> {
    let Some(rows) = body.get("data").and_then(|d| d.as_array()) else {
        return Vec::new();
    };
    let Some(timestamp) = day.and_hms_opt(12, 0, 0) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for district in districts {
        let Some(row) = rows.iter().find(|row| {
            row.get("district")
                .and_then(|v| v.as_str())
                .is_some_and(|name| name == district.name() || name == district.code_str())
        }) else {
            continue;
        };

        let mut covered = false;
        for (metric, key) in [("metro_trips", "metroTrips"), ("bus_trips", "busTrips")] {
            if let Some(value) = row.get(key).and_then(|v| v.as_f64()) {
                covered = true;
                records.push(RawRecord::observed(
                    SourceVariant::Mobility,
                    district.name(),
                    timestamp,
                    metric,
                    value,
                ));
            }
        }
        if covered {
            let (accessibility, connectivity) = INFRASTRUCTURE[district.code() as usize - 1];
            records.push(RawRecord::observed(
                SourceVariant::Mobility,
                district.name(),
                timestamp,
                "accessibility",
                accessibility,
            ));
            records.push(RawRecord::observed(
                SourceVariant::Mobility,
                district.name(),
                timestamp,
                "connectivity",
                connectivity,
            ));
        }
    }
    records
}

#[async_trait]
impl SourceCollector for MobilityCollector {
    fn variant(&self) -> SourceVariant {
        SourceVariant::Mobility
    }

    async fn fetch(&self, range: DateRange, districts: &[District]) -> CollectionResult {
        let Some(token) = self.access_token.as_deref() else {
            return CollectionResult::Unavailable(format!("{ACCESS_TOKEN_ENV} not set"));
        };

        info!("fetching mobility data over {} days", range.num_days());

        let mut records = Vec::new();
        let mut missing = Vec::new();
        for day in range.iter_days() {
            match self.fetch_day(token, day).await {
                Ok(body) => {
                    let day_records = parse_ridership(&body, day, districts);
                    let covered: Vec<&str> =
                        day_records.iter().map(|r| r.district.as_str()).collect();
                    for &district in districts {
                        if !covered.contains(&district.name()) {
                            missing.push((district, day));
                        }
                    }
                    records.extend(day_records);
                }
                Err(reason) => {
                    warn!("mobility fetch failed for {day}: {reason}");
                    missing.extend(districts.iter().map(|&d| (d, day)));
                }
            }
            tokio::time::sleep(self.pace).await;
        }

        classify(records, missing, "EMT ridership API returned no data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::DistrictRegistry;

    #[tokio::test]
    async fn missing_token_reports_unavailable() {
        let registry = DistrictRegistry::new();
        let collector = MobilityCollector::new(None);
        let range = DateRange::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let result = collector.fetch(range, registry.all()).await;
        assert!(result.is_unavailable());
    }

    #[test]
    fn parses_ridership_and_attaches_infrastructure_scores() {
        let registry = DistrictRegistry::new();
        let districts = vec![registry.resolve("Centro").unwrap()];
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let body: serde_json::Value = serde_json::from_str(
            r#"{"data":[{"district":"Centro","metroTrips":120000.0,"busTrips":80000.0}]}"#,
        )
        .unwrap();

        let records = parse_ridership(&body, day, &districts);
        let metrics: Vec<&str> = records.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(
            metrics,
            vec!["metro_trips", "bus_trips", "accessibility", "connectivity"]
        );
        let accessibility = records.iter().find(|r| r.metric == "accessibility").unwrap();
        assert_eq!(accessibility.value, 0.95);
    }

    #[test]
    fn districts_absent_from_payload_yield_nothing() {
        let registry = DistrictRegistry::new();
        let districts = vec![registry.resolve("Barajas").unwrap()];
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(r#"{"data":[{"district":"Centro","metroTrips":1.0}]}"#).unwrap();

        assert!(parse_ridership(&body, day, &districts).is_empty());
    }
}
