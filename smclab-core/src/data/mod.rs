//! Price data sources and the instrument list

pub mod circuit_breaker;
pub mod csv_source;
pub mod instruments;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_source::CsvProvider;
pub use instruments::{InstrumentList, InstrumentListError};
pub use provider::{
    lookback_start, DataError, DataSource, FetchResult, PriceProvider, Sample, SampleInterval,
};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
