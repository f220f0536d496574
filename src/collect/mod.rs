//! Source collectors: the four HTTP-backed collaborators feeding the engine.
//!
//! Every collector implements the same capability: produce raw records for a
//! date range and district set, or say explicitly why it cannot. Transient
//! network and API failures are never raised as errors; they surface as
//! `PartialFailure` or `Unavailable` so the engine can decide on fallback.
//! Each collector paces its own requests against its source's rate ceiling;
//! the engine never retries on a collector's behalf.

pub mod air_quality;
pub mod electricity;
pub mod mobility;
pub mod weather;

use crate::districts::District;
use crate::types::collection::CollectionResult;
use crate::types::date_range::DateRange;
use crate::types::record::RawRecord;
use crate::types::source::SourceVariant;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use air_quality::AirQualityCollector;
pub use electricity::ElectricityPriceCollector;
pub use mobility::MobilityCollector;
pub use weather::WeatherCollector;

/// Capability implemented by every source collector variant.
///
/// `fetch` must not fail: all failure modes are expressed through
/// [`CollectionResult`]. Side effects are limited to network I/O.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Which variant this collector feeds.
    fn variant(&self) -> SourceVariant;

    /// Fetches raw records for the requested range and districts.
    async fn fetch(&self, range: DateRange, districts: &[District]) -> CollectionResult;
}

/// Classifies a finished fetch: no records at all means the source was
/// unavailable, remaining gaps mean partial failure.
pub(crate) fn classify(
    records: Vec<RawRecord>,
    missing: Vec<(District, NaiveDate)>,
    unavailable_reason: &str,
) -> CollectionResult {
    if records.is_empty() {
        CollectionResult::Unavailable(unavailable_reason.to_string())
    } else if missing.is_empty() {
        CollectionResult::Success(records)
    } else {
        CollectionResult::PartialFailure { records, missing }
    }
}
