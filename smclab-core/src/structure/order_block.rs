//! Order block detection.
//!
//! A structure break at candle `i` flags candle `i-1` as an order block:
//! - Demand: candle `i` makes a higher high and candle `i-1` made a higher low.
//! - Supply: candle `i` makes a lower low and candle `i-1` made a lower high.
//!
//! Breaks are scanned for `i` in `2..n`, so both labels always exist. Every
//! match is reported in scan order; consumers take the last one. An outside
//! candle following an inside candle satisfies both rules and yields a Demand
//! block followed by a Supply block at the same index.

use serde::{Deserialize, Serialize};

use super::swing::SwingLabels;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderBlockKind {
    Demand,
    Supply,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub kind: OrderBlockKind,
    /// Candle index of the block (the candle just before the break).
    pub index: usize,
    /// The block candle's open; used as the trigger's stop.
    pub reference_price: f64,
    /// The block candle's low (Demand) or high (Supply).
    pub boundary_price: f64,
}

impl OrderBlock {
    pub fn demand(index: usize, candle: &Candle) -> Self {
        Self {
            kind: OrderBlockKind::Demand,
            index,
            reference_price: candle.open,
            boundary_price: candle.low,
        }
    }

    pub fn supply(index: usize, candle: &Candle) -> Self {
        Self {
            kind: OrderBlockKind::Supply,
            index,
            reference_price: candle.open,
            boundary_price: candle.high,
        }
    }

    /// Candle index of the structure break that created this block.
    pub fn break_index(&self) -> usize {
        self.index + 1
    }
}

/// All order blocks in `candles`, in scan order.
pub fn detect_order_blocks(candles: &[Candle], labels: &SwingLabels) -> Vec<OrderBlock> {
    let mut blocks = Vec::new();
    for i in 2..candles.len() {
        let (Some(cur), Some(prev)) = (labels.at(i), labels.at(i - 1)) else {
            continue;
        };
        let block_candle = &candles[i - 1];

        if cur.is_higher_high() && prev.is_higher_low() {
            blocks.push(OrderBlock::demand(i - 1, block_candle));
        }
        if cur.is_lower_low() && prev.is_lower_high() {
            blocks.push(OrderBlock::supply(i - 1, block_candle));
        }
    }
    blocks
}
