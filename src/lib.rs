mod collect;
mod districts;
mod engine;
mod error;
mod fallback;
mod indices;
mod normalize;
mod output;
mod types;

pub use error::DistritoError;

pub use engine::error::IntegrationError;
pub use engine::report::{IntegrationReport, SourceStats};
pub use engine::{Integration, IntegrationEngine};

pub use collect::{
    AirQualityCollector, ElectricityPriceCollector, MobilityCollector, SourceCollector,
    WeatherCollector,
};

pub use districts::{District, DistrictRegistry, UnknownDistrictError};
pub use fallback::FallbackGenerator;
pub use indices::IndexConfig;
pub use normalize::{NormalizeError, NormalizeOutcome, RecordNormalizer};
pub use output::{save_feature_table, save_report, OutputError};

pub use types::collection::CollectionResult;
pub use types::date_range::{DateRange, InvalidDateRange};
pub use types::record::{RawRecord, TidyRecord};
pub use types::source::{AggregateRule, FallbackBand, MetricSpec, SourceVariant};
