//! Trigger evaluation — does the latest candle confirm the latest order block?
//!
//! The gap is measured at the break candle (`order_block.index + 1`). Only
//! aligned pairs can fire:
//! - Demand + Bullish gap: `current.low >= boundary` and `current.high >= gap.end`
//!   fires Buy at `gap.end`.
//! - Supply + Bearish gap: `current.high <= boundary` and `current.low <= gap.start`
//!   fires Sell at `gap.start`.
//!
//! The stop is always the order block's reference price (its open).

use serde::{Deserialize, Serialize};

use super::fvg::{FairValueGap, GapDetector, GapKind};
use super::order_block::{OrderBlock, OrderBlockKind};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    Buy,
    Sell,
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::Buy => "BUY",
            TriggerKind::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub entry_price: f64,
    pub stop_price: f64,
}

/// Why an evaluation that had candles produced no trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoSignal {
    NoOrderBlock,
    NoFairValueGap,
    ConditionsUnmet,
}

/// Check the trigger rules against an already-detected gap.
pub fn check_trigger(current: &Candle, order_block: &OrderBlock, gap: &FairValueGap) -> Option<Trigger> {
    match (order_block.kind, gap.kind) {
        (OrderBlockKind::Demand, GapKind::Bullish)
            if current.low >= order_block.boundary_price && current.high >= gap.end_price =>
        {
            Some(Trigger {
                kind: TriggerKind::Buy,
                entry_price: gap.end_price,
                stop_price: order_block.reference_price,
            })
        }
        (OrderBlockKind::Supply, GapKind::Bearish)
            if current.high <= order_block.boundary_price && current.low <= gap.start_price =>
        {
            Some(Trigger {
                kind: TriggerKind::Sell,
                entry_price: gap.start_price,
                stop_price: order_block.reference_price,
            })
        }
        _ => None,
    }
}

/// Evaluate the trigger for `order_block` against the full candle sequence.
///
/// Returns the gap that was found (if any) alongside the decision so callers
/// can report which stage stopped the signal.
pub fn evaluate_trigger(
    candles: &[Candle],
    order_block: &OrderBlock,
    gaps: &GapDetector,
) -> Result<(FairValueGap, Trigger), NoSignal> {
    let gap = gaps
        .detect(candles, order_block.break_index())
        .ok_or(NoSignal::NoFairValueGap)?;
    let current = candles.last().ok_or(NoSignal::NoFairValueGap)?;
    let trigger = check_trigger(current, order_block, &gap).ok_or(NoSignal::ConditionsUnmet)?;
    Ok((gap, trigger))
}
