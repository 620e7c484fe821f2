//! Swing classification — each candle's high and low against its predecessor.
//!
//! Label `i` is derived from candles `i-1` and `i` only. Candle 0 has no
//! label. Equal highs (or lows) produce no label on that axis.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighSwing {
    HigherHigh,
    LowerHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LowSwing {
    HigherLow,
    LowerLow,
}

/// Swing label of one candle, tagged with the candle index it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingLabel {
    pub candle_index: usize,
    pub high: Option<HighSwing>,
    pub low: Option<LowSwing>,
}

impl SwingLabel {
    pub fn classify(candle_index: usize, prev: &Candle, cur: &Candle) -> Self {
        let high = if cur.high > prev.high {
            Some(HighSwing::HigherHigh)
        } else if cur.high < prev.high {
            Some(HighSwing::LowerHigh)
        } else {
            None
        };
        let low = if cur.low > prev.low {
            Some(LowSwing::HigherLow)
        } else if cur.low < prev.low {
            Some(LowSwing::LowerLow)
        } else {
            None
        };
        Self {
            candle_index,
            high,
            low,
        }
    }

    pub fn is_higher_high(&self) -> bool {
        self.high == Some(HighSwing::HigherHigh)
    }

    pub fn is_lower_high(&self) -> bool {
        self.high == Some(HighSwing::LowerHigh)
    }

    pub fn is_higher_low(&self) -> bool {
        self.low == Some(LowSwing::HigherLow)
    }

    pub fn is_lower_low(&self) -> bool {
        self.low == Some(LowSwing::LowerLow)
    }

    /// Compact notation used in logs and the `inspect` output: `HH/HL`, `LH/-`, ...
    pub fn notation(&self) -> String {
        let high = match self.high {
            Some(HighSwing::HigherHigh) => "HH",
            Some(HighSwing::LowerHigh) => "LH",
            None => "-",
        };
        let low = match self.low {
            Some(LowSwing::HigherLow) => "HL",
            Some(LowSwing::LowerLow) => "LL",
            None => "-",
        };
        format!("{high}/{low}")
    }
}

/// Swing labels for a candle sequence.
///
/// Holds one label per candle from index 1 on; lookups go by candle index so
/// callers never translate between label positions and candle positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwingLabels {
    labels: Vec<SwingLabel>,
}

impl SwingLabels {
    pub fn classify(candles: &[Candle]) -> Self {
        let labels = candles
            .windows(2)
            .enumerate()
            .map(|(i, pair)| SwingLabel::classify(i + 1, &pair[0], &pair[1]))
            .collect();
        Self { labels }
    }

    /// Label of candle `candle_index`; `None` for candle 0 or past the end.
    pub fn at(&self, candle_index: usize) -> Option<&SwingLabel> {
        candle_index
            .checked_sub(1)
            .and_then(|pos| self.labels.get(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwingLabel> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::candles_from_ranges;

    #[test]
    fn first_candle_has_no_label() {
        let candles = candles_from_ranges(&[(10.0, 5.0), (12.0, 6.0)]);
        let labels = SwingLabels::classify(&candles);
        assert_eq!(labels.len(), 1);
        assert!(labels.at(0).is_none());
        assert_eq!(labels.at(1).unwrap().candle_index, 1);
    }

    #[test]
    fn classifies_each_axis_independently() {
        let candles = candles_from_ranges(&[(10.0, 5.0), (12.0, 4.0), (11.0, 4.0), (11.0, 6.0)]);
        let labels = SwingLabels::classify(&candles);

        let l1 = labels.at(1).unwrap();
        assert!(l1.is_higher_high() && l1.is_lower_low());

        let l2 = labels.at(2).unwrap();
        assert!(l2.is_lower_high());
        assert_eq!(l2.low, None);

        let l3 = labels.at(3).unwrap();
        assert_eq!(l3.high, None);
        assert!(l3.is_higher_low());
    }

    #[test]
    fn notation_is_compact() {
        let candles = candles_from_ranges(&[(10.0, 5.0), (10.0, 4.0)]);
        let labels = SwingLabels::classify(&candles);
        assert_eq!(labels.at(1).unwrap().notation(), "-/LL");
    }

    #[test]
    fn empty_and_single_candle_have_no_labels() {
        assert!(SwingLabels::classify(&[]).is_empty());
        assert!(SwingLabels::classify(&candles_from_ranges(&[(1.0, 0.5)])).is_empty());
    }
}
