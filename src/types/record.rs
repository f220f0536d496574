//! Raw and normalized observation records.

use crate::districts::District;
use crate::types::source::SourceVariant;
use chrono::{NaiveDate, NaiveDateTime};

/// One observation as produced by a collector or the fallback generator.
///
/// The district identifier is still free text at this stage; resolution
/// happens in the normalizer. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// District identifier as the source reported it (name, code, variant
    /// spelling). Resolved later against the registry.
    pub district: String,
    /// Observation timestamp; may be sub-daily.
    pub timestamp: NaiveDateTime,
    /// Metric name within the variant's vocabulary.
    pub metric: String,
    pub value: f64,
    pub variant: SourceVariant,
    /// True when the record was produced by the fallback generator rather
    /// than observed.
    pub simulated: bool,
}

impl RawRecord {
    /// A real (observed) record.
    pub fn observed(
        variant: SourceVariant,
        district: impl Into<String>,
        timestamp: NaiveDateTime,
        metric: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            district: district.into(),
            timestamp,
            metric: metric.into(),
            value,
            variant,
            simulated: false,
        }
    }

    /// A simulated (fallback-generated) record.
    pub fn simulated(
        variant: SourceVariant,
        district: impl Into<String>,
        timestamp: NaiveDateTime,
        metric: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            district: district.into(),
            timestamp,
            metric: metric.into(),
            value,
            variant,
            simulated: true,
        }
    }
}

/// A [`RawRecord`] after normalization: district resolved, timestamp truncated
/// to a calendar day, sub-daily collisions already aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct TidyRecord {
    pub district: District,
    pub date: NaiveDate,
    pub metric: String,
    pub value: f64,
    pub variant: SourceVariant,
    pub simulated: bool,
}
