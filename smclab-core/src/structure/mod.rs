//! Smart-money structure detection: swings, order blocks, fair-value gaps, triggers.
//!
//! Every function here is pure over a candle slice. Derived values carry the
//! candle index they refer to, so nothing downstream depends on positional
//! coincidence between differently-shifted sequences.

pub mod fvg;
pub mod order_block;
pub mod swing;
pub mod trigger;

pub use fvg::{detect_fair_value_gap, FairValueGap, GapDetector, GapKind, DEFAULT_MIN_GAP_RATIO};
pub use order_block::{detect_order_blocks, OrderBlock, OrderBlockKind};
pub use swing::{HighSwing, LowSwing, SwingLabel, SwingLabels};
pub use trigger::{check_trigger, evaluate_trigger, NoSignal, Trigger, TriggerKind};

use crate::domain::Candle;

/// Everything the detectors derived from one candle sequence.
#[derive(Debug, Clone)]
pub struct StructureSnapshot {
    pub labels: SwingLabels,
    pub order_blocks: Vec<OrderBlock>,
    pub gap: Option<FairValueGap>,
    pub outcome: Result<Trigger, NoSignal>,
}

impl StructureSnapshot {
    pub fn latest_order_block(&self) -> Option<&OrderBlock> {
        self.order_blocks.last()
    }
}

/// Run the full detector chain over `candles`.
pub fn analyze(candles: &[Candle], gaps: &GapDetector) -> StructureSnapshot {
    let labels = SwingLabels::classify(candles);
    let order_blocks = detect_order_blocks(candles, &labels);

    let (gap, outcome) = match order_blocks.last() {
        None => (None, Err(NoSignal::NoOrderBlock)),
        Some(ob) => {
            let gap = gaps.detect(candles, ob.break_index());
            let outcome = evaluate_trigger(candles, ob, gaps).map(|(_, trigger)| trigger);
            (gap, outcome)
        }
    };

    StructureSnapshot {
        labels,
        order_blocks,
        gap,
        outcome,
    }
}
