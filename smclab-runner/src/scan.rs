//! Scan cycle — evaluate every instrument, then notify.
//!
//! The instrument list is split into batches. Each batch is evaluated on the
//! rayon pool (or sequentially when `batch.parallel` is off) and the cycle
//! pauses between batches to stay under provider rate limits. Once the
//! provider reports itself unavailable (an open circuit breaker), the
//! remaining instruments are marked unavailable without a fetch. Per-instrument
//! failures are outcomes, never errors: only a missing instrument list or a
//! failing notification sink aborts a cycle.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;

use smclab_core::data::{
    CircuitBreaker, CsvProvider, DataError, InstrumentList, InstrumentListError, PriceProvider,
    SyntheticProvider, YahooProvider,
};
use smclab_core::domain::InstrumentId;
use smclab_core::{evaluate_instrument, EvaluationRequest, InstrumentOutcome};

use crate::config::{BatchConfig, ConfigError, DataConfig, ProviderKind};
use crate::notify::{NotificationSink, NotifyError};
use crate::report::{trigger_message, CycleReport, InstrumentResult, NOTHING_DETECTED};
use crate::session::SessionClock;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("instrument list: {0}")]
    Instruments(#[from] InstrumentListError),

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] DataError),
}

/// Build the price provider named in the `[data]` section.
pub fn provider_from_config(data: &DataConfig) -> Result<Box<dyn PriceProvider>, ScanError> {
    let provider: Box<dyn PriceProvider> = match data.provider {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(breaker)?)
        }
        ProviderKind::Csv => Box::new(CsvProvider::new(&data.csv_dir)),
        ProviderKind::Synthetic => Box::new(SyntheticProvider::new()),
    };
    Ok(provider)
}

/// Everything a cycle needs besides the instrument list.
pub struct ScanContext<'a> {
    pub provider: &'a dyn PriceProvider,
    pub sink: &'a dyn NotificationSink,
    pub session: SessionClock,
    pub request: EvaluationRequest,
    pub batch: BatchConfig,
}

impl ScanContext<'_> {
    /// Evaluate every instrument. Never fails; results keep list order.
    pub fn evaluate(&self, instruments: &InstrumentList) -> CycleReport {
        let started_at = Utc::now();
        let batch_count = instruments.len().div_ceil(self.batch.size.max(1));
        let mut results = Vec::with_capacity(instruments.len());

        for (n, batch) in instruments.batches(self.batch.size).enumerate() {
            if !self.provider.is_available() {
                let remaining = &instruments.ids()[results.len()..];
                tracing::warn!(
                    provider = self.provider.name(),
                    skipped = remaining.len(),
                    "provider unavailable; skipping the rest of the cycle"
                );
                let reason = format!("{} is refusing requests", self.provider.name());
                results.extend(remaining.iter().map(|id| InstrumentResult {
                    instrument: id.clone(),
                    outcome: InstrumentOutcome::DataUnavailable {
                        reason: reason.clone(),
                    },
                }));
                break;
            }
            if n > 0 && !self.batch.pause().is_zero() {
                tracing::debug!(pause_secs = self.batch.pause_secs, "pausing between batches");
                std::thread::sleep(self.batch.pause());
            }
            tracing::debug!(batch = n + 1, of = batch_count, size = batch.len(), "evaluating batch");

            let outcomes: Vec<InstrumentResult> = if self.batch.parallel {
                batch.par_iter().map(|id| self.evaluate_one(id)).collect()
            } else {
                batch.iter().map(|id| self.evaluate_one(id)).collect()
            };
            results.extend(outcomes);
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            results,
        };
        tracing::info!(provider = self.provider.name(), "{}", report.summary_line());
        report
    }

    fn evaluate_one(&self, instrument: &InstrumentId) -> InstrumentResult {
        let outcome = evaluate_instrument(self.provider, instrument, &self.request);
        log_outcome(instrument, &outcome);
        InstrumentResult {
            instrument: instrument.clone(),
            outcome,
        }
    }

    /// Deliver a cycle's triggers, or the "nothing detected" notice.
    ///
    /// Returns the number of messages sent. Outside the session window
    /// nothing is sent.
    pub fn notify(&self, report: &CycleReport, now: DateTime<Utc>) -> Result<usize, ScanError> {
        if !self.session.is_live(now) {
            tracing::info!(
                triggers = report.triggers().count(),
                "outside trading session; notifications suppressed"
            );
            return Ok(0);
        }

        let mut sent = 0;
        for trigger in report.triggers() {
            self.sink.send(&trigger_message(trigger))?;
            sent += 1;
        }
        if sent == 0 {
            self.sink.send(NOTHING_DETECTED)?;
            sent = 1;
        }
        tracing::debug!(sink = self.sink.name(), sent, "notifications delivered");
        Ok(sent)
    }

    /// Load the instrument list, evaluate it, and notify.
    pub fn run_cycle(&self, instruments_file: &Path) -> Result<CycleReport, ScanError> {
        let instruments = InstrumentList::from_file(instruments_file)?;
        tracing::info!(
            instruments = instruments.len(),
            path = %instruments_file.display(),
            "scan cycle starting"
        );
        let report = self.evaluate(&instruments);
        self.notify(&report, report.finished_at)?;
        Ok(report)
    }
}

fn log_outcome(instrument: &InstrumentId, outcome: &InstrumentOutcome) {
    match outcome {
        InstrumentOutcome::Triggered(t) => tracing::info!(
            %instrument,
            kind = t.kind.label(),
            entry = t.entry_price,
            stop = t.stop_price,
            "trigger"
        ),
        InstrumentOutcome::NoStructure(reason) => {
            tracing::debug!(%instrument, ?reason, "no trigger")
        }
        InstrumentOutcome::InsufficientHistory { candles, required } => {
            tracing::debug!(%instrument, candles, required, "skipped: insufficient history")
        }
        InstrumentOutcome::DataUnavailable { reason } => {
            tracing::warn!(%instrument, %reason, "data unavailable")
        }
        InstrumentOutcome::Fault { reason } => {
            tracing::error!(%instrument, %reason, "evaluation fault")
        }
    }
}
