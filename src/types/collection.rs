//! The closed result type returned by every source collector.

use crate::districts::District;
use crate::types::record::RawRecord;
use chrono::NaiveDate;

/// Outcome of one collector fetch.
///
/// Collectors never return `Err` for transient network or API failures; the
/// engine needs to distinguish "no data" states, and this enum makes each of
/// them explicit at the call site. Unavailability is recovered via fallback
/// generation, never surfaced as a run failure.
#[derive(Debug, Clone)]
pub enum CollectionResult {
    /// The requested range and district set were fully covered.
    Success(Vec<RawRecord>),
    /// Some records were fetched, but the listed (district, date) cells are
    /// missing and need fallback coverage.
    PartialFailure {
        records: Vec<RawRecord>,
        missing: Vec<(District, NaiveDate)>,
    },
    /// Nothing could be fetched: missing credentials, endpoint down, timeout.
    Unavailable(String),
}

impl CollectionResult {
    /// The fetched records, if any.
    pub fn records(&self) -> &[RawRecord] {
        match self {
            CollectionResult::Success(records) => records,
            CollectionResult::PartialFailure { records, .. } => records,
            CollectionResult::Unavailable(_) => &[],
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CollectionResult::Unavailable(_))
    }
}
