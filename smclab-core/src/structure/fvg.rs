//! Fair-value-gap detection over a three-candle window.
//!
//! For an anchor index `idx`, the window is `c1 = candles[idx-2]`,
//! `c2 = candles[idx-1]`, `c3 = candles[idx]`. The anchor must satisfy
//! `2 <= idx <= n-2`: two candles behind it and at least one after.
//!
//! The gap size is always measured upward, `c3.high - c1.low`, and must exceed
//! `min_gap_ratio * c1.low` strictly. Direction only changes the label:
//! Bullish when `c2` closed above `c1`, Bearish otherwise. The band is
//! `[c1.low, c3.high]` in both cases.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Minimum gap as a fraction of `c1.low`.
pub const DEFAULT_MIN_GAP_RATIO: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapKind {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub kind: GapKind,
    pub start_price: f64,
    pub end_price: f64,
    /// Anchor index (`c3`) the gap was measured at.
    pub candle_index: usize,
}

/// Gap detector with a tunable size threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapDetector {
    pub min_gap_ratio: f64,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self {
            min_gap_ratio: DEFAULT_MIN_GAP_RATIO,
        }
    }
}

impl GapDetector {
    pub fn new(min_gap_ratio: f64) -> Self {
        Self { min_gap_ratio }
    }

    pub fn detect(&self, candles: &[Candle], idx: usize) -> Option<FairValueGap> {
        if idx < 2 || idx + 1 >= candles.len() {
            return None;
        }
        let c1 = &candles[idx - 2];
        let c2 = &candles[idx - 1];
        let c3 = &candles[idx];

        let gap = c3.high - c1.low;
        if gap <= self.min_gap_ratio * c1.low {
            return None;
        }

        let kind = if c2.close > c1.close {
            GapKind::Bullish
        } else {
            GapKind::Bearish
        };

        Some(FairValueGap {
            kind,
            start_price: c1.low,
            end_price: c3.high,
            candle_index: idx,
        })
    }
}

/// Detect a gap at `idx` with the default 1% threshold.
pub fn detect_fair_value_gap(candles: &[Candle], idx: usize) -> Option<FairValueGap> {
    GapDetector::default().detect(candles, idx)
}
