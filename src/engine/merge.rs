//! Left merge of the feature table onto the primary dataset.
//!
//! The primary dataset's district identifiers are resolved through the
//! registry into the same two-digit code the feature table is keyed by. A row
//! whose identifier does not resolve is a coverage gap: it is kept with null
//! feature columns and counted, never dropped. The merge is a left join by
//! contract, so the merged table always has exactly as many rows as the
//! primary dataset.

use crate::districts::DistrictRegistry;
use crate::engine::error::IntegrationError;
use log::warn;
use polars::frame::DataFrame;
use polars::prelude::{col, DataType, IntoLazy, JoinArgs, JoinType};

#[derive(Debug)]
pub(crate) struct MergeOutcome {
    pub frame: DataFrame,
    /// Primary rows whose district identifier could not be resolved.
    pub unmatched_primary_rows: usize,
}

pub(crate) fn left_merge_primary(
    primary: &DataFrame,
    features: DataFrame,
    registry: &DistrictRegistry,
    district_column: &str,
    date_column: &str,
) -> Result<MergeOutcome, IntegrationError> {
    for key in [district_column, date_column] {
        if primary.column(key).is_err() {
            return Err(IntegrationError::MissingKeyColumn(key.to_string()));
        }
    }

    // Resolve the primary's district identifiers into padded code strings.
    let identifiers = primary
        .column(district_column)?
        .cast(&DataType::String)?;
    let identifiers = identifiers.str()?;

    let mut unmatched = 0usize;
    let codes: Vec<Option<String>> = identifiers
        .into_iter()
        .map(|value| match value {
            Some(identifier) => match registry.resolve(identifier) {
                Ok(district) => Some(district.code_str()),
                Err(err) => {
                    warn!("primary row kept with null features: {err}");
                    unmatched += 1;
                    None
                }
            },
            None => {
                unmatched += 1;
                None
            }
        })
        .collect();

    let dates = primary.column(date_column)?.cast(&DataType::String)?;

    let mut keyed = primary.clone();
    keyed.with_column(polars::prelude::Column::new("district_code".into(), codes))?;
    keyed.with_column(dates.with_name("date".into()))?;

    let merged = keyed
        .lazy()
        .join(
            features.lazy(),
            [col("district_code"), col("date")],
            [col("district_code"), col("date")],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    Ok(MergeOutcome {
        frame: merged,
        unmatched_primary_rows: unmatched,
    })
}
