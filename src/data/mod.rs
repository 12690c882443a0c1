//! Data module - CSV loading, cleaning and the typed tables

mod loader;
pub mod normalize;
mod processor;
pub mod schema;
mod tables;

pub use loader::{DataLoader, LoaderError, Overview};
pub use normalize::ParseError;
pub use processor::{CleaningSummary, DataProcessor, ProcessorError};
pub use schema::SchemaError;
pub use tables::{
    BackgroundCheckRecord, BackgroundCheckTable, CensusRecord, CensusTable,
    CENSUS_FRACTION_COLUMNS,
};
pub(crate) use tables::{f64_values, i64_values, str_values};
