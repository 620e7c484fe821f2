//! Candle — the aggregated bar every structural detector consumes.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

/// OHLCV candle covering `[open_time, open_time + duration)`.
///
/// Produced by the bar aggregator and never mutated afterwards. The duration
/// is a property of the whole series, not of the individual candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Right edge of the interval this candle covers.
    pub fn close_time(&self, duration: Duration) -> DateTime<FixedOffset> {
        self.open_time + duration
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high bounds everything from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
