use crate::districts::UnknownDistrictError;
use crate::normalize::NormalizeError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    /// A requested district did not resolve. Raised before any fetching
    /// starts so a bad configuration never wastes a multi-source run.
    #[error("invalid integration configuration: {0}")]
    Configuration(#[from] UnknownDistrictError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("primary dataset is missing required key column '{0}'")]
    MissingKeyColumn(String),

    #[error("dataframe operation failed")]
    Polars(#[from] PolarsError),
}
