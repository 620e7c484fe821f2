//! SMC Lab Core — bar aggregation and smart-money structure detection.
//!
//! This crate contains the detection engine and its data sources:
//! - Domain types (candles, instrument ids)
//! - Bar aggregation onto an anchored, right-closed bucket grid
//! - Swing classification, order blocks, fair-value gaps, trigger evaluation
//! - Per-instrument evaluation with a tagged outcome instead of errors
//! - Price providers (Yahoo Finance, CSV, synthetic) and the instrument list

pub mod aggregate;
pub mod data;
pub mod domain;
pub mod evaluate;
pub mod structure;

#[cfg(test)]
mod test_util;

pub use aggregate::{aggregate, flatten, AggregateError, BarSpec};
pub use evaluate::{
    evaluate_candles, evaluate_instrument, evaluate_samples, DetectionConfig, EvaluationRequest,
    InstrumentOutcome, TriggerReport,
};
