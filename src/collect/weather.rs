//! Weather collector backed by the OpenWeatherMap history API.
//!
//! One request per (district, day) against the district centroid. A missing
//! API key is a normal `Unavailable` state, not a startup failure: the engine
//! covers the gap with simulated records instead.

use crate::collect::{classify, SourceCollector};
use crate::districts::District;
use crate::types::collection::CollectionResult;
use crate::types::date_range::DateRange;
use crate::types::record::RawRecord;
use crate::types::source::SourceVariant;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use reqwest::Client;
use std::time::Duration;

const BASE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall/timemachine";
const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Approximate centroid of each district, indexed by code - 1.
const DISTRICT_CENTROIDS: [(f64, f64); 21] = [
    (40.4168, -3.7038), // Centro
    (40.4000, -3.7000), // Arganzuela
    (40.4200, -3.6800), // Retiro
    (40.4300, -3.6700), // Salamanca
    (40.4500, -3.6700), // Chamartín
    (40.4600, -3.7000), // Tetuán
    (40.4300, -3.7000), // Chamberí
    (40.4800, -3.7500), // Fuencarral-El Pardo
    (40.4400, -3.7200), // Moncloa-Aravaca
    (40.4000, -3.7500), // Latina
    (40.3800, -3.7500), // Carabanchel
    (40.3800, -3.7200), // Usera
    (40.3900, -3.6500), // Puente de Vallecas
    (40.4200, -3.6500), // Moratalaz
    (40.4300, -3.6500), // Ciudad Lineal
    (40.4600, -3.6500), // Hortaleza
    (40.3500, -3.7000), // Villaverde
    (40.3700, -3.6000), // Villa de Vallecas
    (40.4000, -3.6000), // Vicálvaro
    (40.4300, -3.6000), // San Blas-Canillejas
    (40.4800, -3.5800), // Barajas
];

pub struct WeatherCollector {
    client: Client,
    api_key: Option<String>,
    pace: Duration,
}

impl WeatherCollector {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            pace: Duration::from_millis(100),
        }
    }

    /// Reads the API key from `OPENWEATHER_API_KEY`, if set.
    pub fn from_env() -> Self {
        Self::new(std::env::var(API_KEY_ENV).ok())
    }

    async fn fetch_day(
        &self,
        api_key: &str,
        district: District,
        day: NaiveDate,
    ) -> Result<Vec<RawRecord>, String> {
        let (lat, lon) = DISTRICT_CENTROIDS[district.code() as usize - 1];
        let timestamp = day
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("dt", timestamp.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("http status: {e}"))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("invalid json: {e}"))?;

        let observed_at = day
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| day.and_time(chrono::NaiveTime::MIN));
        Ok(parse_observation(&body, district, observed_at))
    }
}

/// Maps one OpenWeatherMap observation onto the weather metric vocabulary.
/// The history endpoint reports a single temperature per call, so min/max
/// start equal to the mean and only diverge when sub-daily records aggregate.
fn parse_observation(
    body: &serde_json::Value,
    district: District,
    observed_at: NaiveDateTime,
) -> Vec<RawRecord> {
    let current = body
        .get("data")
        .and_then(|d| d.get(0))
        .or_else(|| body.get("current"));
    let Some(current) = current else {
        return Vec::new();
    };

    let mut records = Vec::new();
    let mut push = |metric: &str, value: Option<f64>| {
        if let Some(value) = value {
            records.push(RawRecord::observed(
                SourceVariant::Weather,
                district.name(),
                observed_at,
                metric,
                value,
            ));
        }
    };

    let temp = current.get("temp").and_then(|v| v.as_f64());
    push("temp_mean", temp);
    push("temp_min", temp);
    push("temp_max", temp);
    push("humidity", current.get("humidity").and_then(|v| v.as_f64()));
    push("pressure", current.get("pressure").and_then(|v| v.as_f64()));
    push("wind_speed", current.get("wind_speed").and_then(|v| v.as_f64()));
    push(
        "precipitation",
        Some(
            current
                .get("rain")
                .and_then(|r| r.get("1h"))
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
        ),
    );
    records
}

#[async_trait]
impl SourceCollector for WeatherCollector {
    fn variant(&self) -> SourceVariant {
        SourceVariant::Weather
    }

    async fn fetch(&self, range: DateRange, districts: &[District]) -> CollectionResult {
        let Some(api_key) = self.api_key.as_deref() else {
            return CollectionResult::Unavailable(format!("{API_KEY_ENV} not set"));
        };

        info!(
            "fetching weather for {} districts over {} days",
            districts.len(),
            range.num_days()
        );

        let mut records = Vec::new();
        let mut missing = Vec::new();
        for &district in districts {
            for day in range.iter_days() {
                match self.fetch_day(api_key, district, day).await {
                    Ok(day_records) if !day_records.is_empty() => records.extend(day_records),
                    Ok(_) => missing.push((district, day)),
                    Err(reason) => {
                        warn!("weather fetch failed for {district} on {day}: {reason}");
                        missing.push((district, day));
                    }
                }
                tokio::time::sleep(self.pace).await;
            }
        }

        classify(records, missing, "OpenWeatherMap returned no data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::DistrictRegistry;

    #[tokio::test]
    async fn missing_api_key_reports_unavailable() {
        let registry = DistrictRegistry::new();
        let collector = WeatherCollector::new(None);
        let range = DateRange::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let result = collector.fetch(range, registry.all()).await;
        assert!(result.is_unavailable());
    }

    #[test]
    fn parses_onecall_observation() {
        let registry = DistrictRegistry::new();
        let district = registry.resolve("Centro").unwrap();
        let body: serde_json::Value = serde_json::from_str(
            r#"{"data":[{"temp":17.3,"humidity":54,"pressure":1016,"wind_speed":3.2,"rain":{"1h":0.4}}]}"#,
        )
        .unwrap();
        let observed_at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let records = parse_observation(&body, district, observed_at);
        let get = |metric: &str| {
            records
                .iter()
                .find(|r| r.metric == metric)
                .map(|r| r.value)
                .unwrap()
        };
        assert_eq!(get("temp_mean"), 17.3);
        assert_eq!(get("humidity"), 54.0);
        assert_eq!(get("precipitation"), 0.4);
        assert!(records.iter().all(|r| !r.simulated));
    }

    #[test]
    fn missing_rain_defaults_to_zero_precipitation() {
        let registry = DistrictRegistry::new();
        let district = registry.resolve("Retiro").unwrap();
        let body: serde_json::Value =
            serde_json::from_str(r#"{"data":[{"temp":9.0,"humidity":70}]}"#).unwrap();
        let observed_at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let records = parse_observation(&body, district, observed_at);
        let precipitation = records.iter().find(|r| r.metric == "precipitation").unwrap();
        assert_eq!(precipitation.value, 0.0);
        // Fields the payload lacks are simply absent, not zeroed.
        assert!(records.iter().all(|r| r.metric != "pressure"));
    }
}
