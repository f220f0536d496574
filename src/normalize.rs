//! Conversion of raw collector output into the common tidy schema.
//!
//! Each raw record gets its district resolved against the registry and its
//! timestamp truncated to a calendar day. When several sub-daily records
//! collapse onto the same (district, date, metric) cell they are aggregated
//! per the metric's declared rule. A record with an unresolvable district is
//! skipped with a warning; a metric with no declared aggregation rule aborts
//! the batch, since guessing one would corrupt every downstream index.

use crate::districts::DistrictRegistry;
use crate::types::record::{RawRecord, TidyRecord};
use crate::types::source::{AggregateRule, SourceVariant};
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A record named a metric its variant does not declare. Fatal: there is
    /// no safe way to aggregate an undeclared metric.
    #[error("no aggregation policy declared for metric '{metric}' of source '{variant}'")]
    AggregationPolicyMissing {
        variant: SourceVariant,
        metric: String,
    },
}

/// Result of normalizing one batch of raw records.
#[derive(Debug)]
pub struct NormalizeOutcome {
    pub records: Vec<TidyRecord>,
    /// Records dropped because their district identifier did not resolve.
    pub skipped: usize,
}

/// Normalizes raw records into [`TidyRecord`]s.
pub struct RecordNormalizer<'a> {
    registry: &'a DistrictRegistry,
}

/// Per-cell aggregation state.
enum Accumulator {
    Mean { sum: f64, count: u32 },
    Sum { sum: f64 },
    Last { at: NaiveDateTime, value: f64 },
}

impl Accumulator {
    fn start(rule: AggregateRule, value: f64, at: NaiveDateTime) -> Self {
        match rule {
            AggregateRule::Mean => Accumulator::Mean { sum: value, count: 1 },
            AggregateRule::Sum => Accumulator::Sum { sum: value },
            AggregateRule::Last => Accumulator::Last { at, value },
        }
    }

    fn push(&mut self, value: f64, at: NaiveDateTime) {
        match self {
            Accumulator::Mean { sum, count } => {
                *sum += value;
                *count += 1;
            }
            Accumulator::Sum { sum } => *sum += value,
            Accumulator::Last { at: latest, value: kept } => {
                // Ties keep the earlier-seen record (stable in input order).
                if at > *latest {
                    *latest = at;
                    *kept = value;
                }
            }
        }
    }

    fn finish(&self) -> f64 {
        match self {
            Accumulator::Mean { sum, count } => sum / f64::from(*count),
            Accumulator::Sum { sum } => *sum,
            Accumulator::Last { value, .. } => *value,
        }
    }
}

struct Cell {
    variant: SourceVariant,
    simulated: bool,
    acc: Accumulator,
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(registry: &'a DistrictRegistry) -> Self {
        Self { registry }
    }

    /// Normalizes a batch, aggregating sub-daily collisions per metric rule.
    ///
    /// Output is sorted by (variant, district, date, metric) so downstream
    /// pivoting is deterministic regardless of collector output order.
    pub fn normalize(&self, raw: &[RawRecord]) -> Result<NormalizeOutcome, NormalizeError> {
        let mut cells: BTreeMap<(u64, u8, NaiveDate, String), Cell> = BTreeMap::new();
        let mut skipped = 0usize;

        for record in raw {
            let spec = record.variant.metric(&record.metric).ok_or_else(|| {
                NormalizeError::AggregationPolicyMissing {
                    variant: record.variant,
                    metric: record.metric.clone(),
                }
            })?;

            let district = match self.registry.resolve(&record.district) {
                Ok(district) => district,
                Err(err) => {
                    // One bad record must not drop the batch.
                    warn!("skipping {} record: {}", record.variant, err);
                    skipped += 1;
                    continue;
                }
            };

            let date = record.timestamp.date();
            let key = (
                record.variant.seed_tag(),
                district.code(),
                date,
                record.metric.clone(),
            );
            match cells.get_mut(&key) {
                Some(cell) => {
                    cell.acc.push(record.value, record.timestamp);
                    cell.simulated |= record.simulated;
                }
                None => {
                    cells.insert(
                        key,
                        Cell {
                            variant: record.variant,
                            simulated: record.simulated,
                            acc: Accumulator::start(spec.aggregate, record.value, record.timestamp),
                        },
                    );
                }
            }
        }

        let records = cells
            .into_iter()
            .filter_map(|((_, code, date, metric), cell)| {
                // The code came out of a resolved District, so this lookup holds.
                let district = self.registry.by_code(code).ok()?;
                Some(TidyRecord {
                    district,
                    date,
                    metric,
                    value: cell.acc.finish(),
                    variant: cell.variant,
                    simulated: cell.simulated,
                })
            })
            .collect();

        Ok(NormalizeOutcome { records, skipped })
    }
}
