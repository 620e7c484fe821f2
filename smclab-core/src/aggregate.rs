//! Bar aggregation — resample fine-grained samples into fixed-duration candles.
//!
//! Buckets live on a grid `anchor + k * duration`. Grouping is closed on the
//! right: a sample stamped `t` belongs to the bucket `(start, start + duration]`
//! and the resulting candle is labelled with `start`. A sample stamped exactly
//! on a grid point therefore closes the previous bucket rather than opening
//! the next one.
//!
//! - open = first sample's open, close = last sample's close
//! - high = max of highs, low = min of lows, volume = sum
//! - buckets without samples are not emitted
//! - empty input yields an empty sequence, not an error

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::data::Sample;
use crate::domain::Candle;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("bar duration must be positive, got {0}")]
    NonPositiveDuration(Duration),

    #[error("invalid UTC offset: {0} seconds")]
    InvalidOffset(i32),

    #[error("samples out of order at index {index}: {time} does not follow {previous}")]
    UnsortedSamples {
        index: usize,
        time: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("non-finite price in sample {index} at {time}")]
    NonFinitePrice { index: usize, time: DateTime<Utc> },

    #[error("inconsistent OHLC in sample {index} at {time}: high/low do not bound open/close")]
    InconsistentRange { index: usize, time: DateTime<Utc> },
}

/// Bar duration plus the anchor instant that fixes the bucket grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSpec {
    duration: Duration,
    anchor: DateTime<FixedOffset>,
}

impl BarSpec {
    pub fn new(duration: Duration, anchor: DateTime<FixedOffset>) -> Result<Self, AggregateError> {
        if duration <= Duration::zero() {
            return Err(AggregateError::NonPositiveDuration(duration));
        }
        Ok(Self { duration, anchor })
    }

    /// Grid anchored at a local time of day, e.g. 09:00 at UTC+9.
    pub fn daily_anchor(
        duration: Duration,
        utc_offset_secs: i32,
        time_of_day: NaiveTime,
    ) -> Result<Self, AggregateError> {
        let offset = FixedOffset::east_opt(utc_offset_secs)
            .ok_or(AggregateError::InvalidOffset(utc_offset_secs))?;
        // Any date works: the grid repeats daily whenever duration divides 24h.
        let date = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default();
        let anchor = offset
            .from_local_datetime(&date.and_time(time_of_day))
            .single()
            .ok_or(AggregateError::InvalidOffset(utc_offset_secs))?;
        Self::new(duration, anchor)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn anchor(&self) -> DateTime<FixedOffset> {
        self.anchor
    }

    fn step_ms(&self) -> i64 {
        self.duration.num_milliseconds().max(1)
    }

    /// Start of the right-closed bucket that `t` falls into.
    pub fn bucket_start(&self, t: DateTime<Utc>) -> DateTime<FixedOffset> {
        let step = self.step_ms();
        let elapsed = (t - self.anchor.with_timezone(&Utc)).num_milliseconds();
        // ceil(elapsed / step) - 1
        let k = -(-elapsed).div_euclid(step) - 1;
        self.anchor + Duration::milliseconds(k * step)
    }

    /// First grid point strictly after `t`.
    pub fn next_boundary(&self, t: DateTime<Utc>) -> DateTime<FixedOffset> {
        let step = self.step_ms();
        let elapsed = (t - self.anchor.with_timezone(&Utc)).num_milliseconds();
        let k = elapsed.div_euclid(step) + 1;
        self.anchor + Duration::milliseconds(k * step)
    }
}

/// Aggregate samples into candles on the `spec` grid.
pub fn aggregate(samples: &[Sample], spec: &BarSpec) -> Result<Vec<Candle>, AggregateError> {
    let mut candles: Vec<Candle> = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;

    for (index, sample) in samples.iter().enumerate() {
        if let Some(prev) = previous {
            if sample.time <= prev {
                return Err(AggregateError::UnsortedSamples {
                    index,
                    time: sample.time,
                    previous: prev,
                });
            }
        }
        previous = Some(sample.time);

        if ![sample.open, sample.high, sample.low, sample.close]
            .iter()
            .all(|p| p.is_finite())
        {
            return Err(AggregateError::NonFinitePrice {
                index,
                time: sample.time,
            });
        }

        let bar = Candle {
            open_time: spec.bucket_start(sample.time),
            open: sample.open,
            high: sample.high,
            low: sample.low,
            close: sample.close,
            volume: sample.volume,
        };
        if !bar.is_sane() {
            return Err(AggregateError::InconsistentRange {
                index,
                time: sample.time,
            });
        }

        match candles.last_mut() {
            Some(current) if current.open_time == bar.open_time => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => candles.push(bar),
        }
    }

    Ok(candles)
}

/// Turn candles back into samples stamped at each candle's close time.
///
/// Re-aggregating the result on the same grid reproduces the input exactly,
/// since every close time sits on the right edge of its own bucket.
pub fn flatten(candles: &[Candle], duration: Duration) -> Vec<Sample> {
    candles
        .iter()
        .map(|c| Sample {
            time: c.close_time(duration).with_timezone(&Utc),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })
        .collect()
}
