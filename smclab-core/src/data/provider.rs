//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over raw price sources (Yahoo Finance,
//! CSV files, synthetic random walks) so the scan cycle can swap them and
//! tests can mock them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::InstrumentId;

/// Raw OHLCV row at the provider's native (finer) sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Sampling interval requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleInterval {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
}

impl SampleInterval {
    /// Provider-facing code (`1m`, `1h`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            SampleInterval::Min1 => "1m",
            SampleInterval::Min5 => "5m",
            SampleInterval::Min15 => "15m",
            SampleInterval::Min30 => "30m",
            SampleInterval::Hour1 => "1h",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            SampleInterval::Min1 => Duration::minutes(1),
            SampleInterval::Min5 => Duration::minutes(5),
            SampleInterval::Min15 => Duration::minutes(15),
            SampleInterval::Min30 => Duration::minutes(30),
            SampleInterval::Hour1 => Duration::hours(1),
        }
    }
}

impl fmt::Display for SampleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SampleInterval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(SampleInterval::Min1),
            "5m" => Ok(SampleInterval::Min5),
            "15m" => Ok(SampleInterval::Min15),
            "30m" => Ok(SampleInterval::Min30),
            "1h" | "60m" => Ok(SampleInterval::Hour1),
            other => Err(DataError::Other(format!("unsupported sample interval '{other}'"))),
        }
    }
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in both log lines and chat notices.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("instrument not found: {instrument}")]
    InstrumentNotFound { instrument: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("csv error: {0}")]
    Csv(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Start of a lookback window ending at `end`.
///
/// Fails instead of panicking when `lookback` reaches past the earliest
/// representable instant.
pub fn lookback_start(end: DateTime<Utc>, lookback: Duration) -> Result<DateTime<Utc>, DataError> {
    end.checked_sub_signed(lookback).ok_or_else(|| {
        DataError::Other(format!(
            "lookback of {} days before {end} is out of range",
            lookback.num_days()
        ))
    })
}

/// Result of a successful fetch for a single instrument.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub instrument: InstrumentId,
    pub samples: Vec<Sample>,
    pub source: DataSource,
}

/// Where the samples came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Trait for raw price providers.
///
/// An `Ok` result with zero samples is legal and means "nothing to evaluate";
/// callers treat it the same as a failed fetch.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch samples covering the most recent `lookback` at `interval` resolution.
    fn fetch_series(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        interval: SampleInterval,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}
