use crate::districts::UnknownDistrictError;
use crate::engine::error::IntegrationError;
use crate::normalize::NormalizeError;
use crate::output::OutputError;
use crate::types::date_range::InvalidDateRange;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistritoError {
    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    UnknownDistrict(#[from] UnknownDistrictError),

    #[error(transparent)]
    InvalidDateRange(#[from] InvalidDateRange),

    #[error(transparent)]
    Output(#[from] OutputError),
}
