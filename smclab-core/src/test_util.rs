use chrono::{DateTime, Duration, FixedOffset};

use crate::domain::Candle;

pub(crate) fn base_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-03-04T09:00:00+09:00").unwrap()
}

/// 4-hour candles from `(open, high, low, close)` tuples.
pub(crate) fn candles_from_ohlc(rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            open_time: base_time() + Duration::hours(4 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000,
        })
        .collect()
}

/// 4-hour candles from `(high, low)` pairs; open and close sit at the midpoint.
pub(crate) fn candles_from_ranges(rows: &[(f64, f64)]) -> Vec<Candle> {
    let ohlc: Vec<(f64, f64, f64, f64)> = rows
        .iter()
        .map(|&(high, low)| {
            let mid = (high + low) / 2.0;
            (mid, high, low, mid)
        })
        .collect();
    candles_from_ohlc(&ohlc)
}
