//! Domain types for SMC Lab

pub mod candle;
pub mod ids;

pub use candle::Candle;
pub use ids::InstrumentId;
