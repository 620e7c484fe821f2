//! Cycle reports and message text.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use smclab_core::domain::InstrumentId;
use smclab_core::{BarSpec, InstrumentOutcome, TriggerReport};

/// Sent when a cycle finishes without any trigger.
pub const NOTHING_DETECTED: &str = "SMC scan complete: no trigger detected";

/// One instrument's result within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument: InstrumentId,
    pub outcome: InstrumentOutcome,
}

/// Everything one scan cycle produced, in instrument-list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<InstrumentResult>,
}

impl CycleReport {
    pub fn triggers(&self) -> impl Iterator<Item = &TriggerReport> {
        self.results.iter().filter_map(|r| r.outcome.trigger())
    }

    pub fn has_triggers(&self) -> bool {
        self.triggers().next().is_some()
    }

    /// Number of instruments per outcome tag.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.results {
            *counts.entry(r.outcome.tag()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, tag: &str) -> usize {
        self.results.iter().filter(|r| r.outcome.tag() == tag).count()
    }

    /// One line for logs and the CLI.
    pub fn summary_line(&self) -> String {
        let elapsed = (self.finished_at - self.started_at).num_milliseconds();
        let parts: Vec<String> = self
            .counts()
            .iter()
            .map(|(tag, n)| format!("{tag}={n}"))
            .collect();
        format!(
            "{} instruments in {elapsed}ms: {}",
            self.results.len(),
            if parts.is_empty() {
                "nothing evaluated".to_string()
            } else {
                parts.join(", ")
            }
        )
    }
}

/// `"{instrument} {BUY|SELL} trigger | entry {p:.4} | stop {s:.4}"`
pub fn trigger_message(report: &TriggerReport) -> String {
    format!(
        "{} {} trigger | entry {:.4} | stop {:.4}",
        report.instrument,
        report.kind.label(),
        report.entry_price,
        report.stop_price
    )
}

/// Notice sent once when the watch loop starts.
pub fn startup_notice(bars: &BarSpec) -> String {
    let hours = bars.duration().num_minutes() as f64 / 60.0;
    format!(
        "SMC trigger bot started ({hours}h bars anchored at {} UTC{})",
        bars.anchor().format("%H:%M"),
        bars.anchor().offset()
    )
}
