//! Per-instrument evaluation: fetch → aggregate → detect → decide.
//!
//! Every way an instrument can fall out of the pipeline is a variant of
//! [`InstrumentOutcome`]; nothing here panics or returns `Err` for a single
//! instrument's data, so a batch driver can evaluate many instruments without
//! one of them aborting the rest.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, BarSpec};
use crate::data::{PriceProvider, Sample, SampleInterval};
use crate::domain::{Candle, InstrumentId};
use crate::structure::{analyze, GapDetector, NoSignal, StructureSnapshot, TriggerKind};

/// Fewest candles worth running the detectors on.
pub const DEFAULT_MIN_CANDLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub min_candles: usize,
    pub min_gap_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_candles: DEFAULT_MIN_CANDLES,
            min_gap_ratio: crate::structure::DEFAULT_MIN_GAP_RATIO,
        }
    }
}

impl DetectionConfig {
    pub fn gap_detector(&self) -> GapDetector {
        GapDetector::new(self.min_gap_ratio)
    }
}

/// Everything needed to evaluate one instrument end to end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationRequest {
    pub bars: BarSpec,
    pub lookback: Duration,
    pub interval: SampleInterval,
    pub detection: DetectionConfig,
}

/// A fired trigger, addressed to the notification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerReport {
    pub instrument: InstrumentId,
    pub kind: TriggerKind,
    pub entry_price: f64,
    pub stop_price: f64,
    /// Open time of the candle that confirmed the trigger.
    pub bar_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrumentOutcome {
    Triggered(TriggerReport),
    /// Candles were available but the structure did not produce a trigger.
    NoStructure(NoSignal),
    /// Fewer candles than the detectors need; skipped without a report.
    InsufficientHistory { candles: usize, required: usize },
    /// The provider failed or returned nothing.
    DataUnavailable { reason: String },
    /// Any other per-instrument failure (malformed series and the like).
    Fault { reason: String },
}

impl InstrumentOutcome {
    pub fn trigger(&self) -> Option<&TriggerReport> {
        match self {
            InstrumentOutcome::Triggered(report) => Some(report),
            _ => None,
        }
    }

    /// Short machine-friendly tag for logs and summaries.
    pub fn tag(&self) -> &'static str {
        match self {
            InstrumentOutcome::Triggered(_) => "triggered",
            InstrumentOutcome::NoStructure(_) => "no_structure",
            InstrumentOutcome::InsufficientHistory { .. } => "insufficient_history",
            InstrumentOutcome::DataUnavailable { .. } => "data_unavailable",
            InstrumentOutcome::Fault { .. } => "fault",
        }
    }
}

/// Detector chain over already-aggregated candles.
pub fn evaluate_candles(
    instrument: &InstrumentId,
    candles: &[Candle],
    detection: &DetectionConfig,
) -> InstrumentOutcome {
    if candles.len() < detection.min_candles {
        tracing::debug!(
            %instrument,
            candles = candles.len(),
            required = detection.min_candles,
            "not enough candles"
        );
        return InstrumentOutcome::InsufficientHistory {
            candles: candles.len(),
            required: detection.min_candles,
        };
    }

    let snapshot = analyze(candles, &detection.gap_detector());
    outcome_from_snapshot(instrument, candles, &snapshot)
}

fn outcome_from_snapshot(
    instrument: &InstrumentId,
    candles: &[Candle],
    snapshot: &StructureSnapshot,
) -> InstrumentOutcome {
    match (&snapshot.outcome, candles.last()) {
        (Ok(trigger), Some(current)) => InstrumentOutcome::Triggered(TriggerReport {
            instrument: instrument.clone(),
            kind: trigger.kind,
            entry_price: trigger.entry_price,
            stop_price: trigger.stop_price,
            bar_time: current.open_time,
        }),
        (Ok(_), None) => InstrumentOutcome::NoStructure(NoSignal::NoOrderBlock),
        (Err(reason), _) => InstrumentOutcome::NoStructure(*reason),
    }
}

/// Aggregate raw samples and run the detector chain.
pub fn evaluate_samples(
    instrument: &InstrumentId,
    samples: &[Sample],
    request: &EvaluationRequest,
) -> InstrumentOutcome {
    if samples.is_empty() {
        return InstrumentOutcome::DataUnavailable {
            reason: "provider returned no samples".into(),
        };
    }

    match aggregate(samples, &request.bars) {
        Ok(candles) => evaluate_candles(instrument, &candles, &request.detection),
        Err(e) => InstrumentOutcome::Fault {
            reason: format!("aggregation failed: {e}"),
        },
    }
}

/// Fetch, aggregate and evaluate one instrument.
pub fn evaluate_instrument(
    provider: &dyn PriceProvider,
    instrument: &InstrumentId,
    request: &EvaluationRequest,
) -> InstrumentOutcome {
    match provider.fetch_series(instrument, request.lookback, request.interval) {
        Ok(fetched) => evaluate_samples(instrument, &fetched.samples, request),
        Err(e) => InstrumentOutcome::DataUnavailable {
            reason: e.to_string(),
        },
    }
}
