//! Integration tests for the scan cycle: fault isolation, ordering,
//! notification text and session gating, driven by an in-memory provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use smclab_core::aggregate::flatten;
use smclab_core::data::{
    CsvProvider, DataError, DataSource, FetchResult, InstrumentList, PriceProvider, Sample,
    SampleInterval,
};
use smclab_core::domain::{Candle, InstrumentId};
use smclab_core::{BarSpec, DetectionConfig, EvaluationRequest, InstrumentOutcome};
use smclab_runner::config::{BatchConfig, SessionConfig};
use smclab_runner::{
    MemorySink, NotificationSink, NotifyError, ScanContext, ScanError, SessionClock,
    NOTHING_DETECTED,
};

fn bars() -> BarSpec {
    BarSpec::daily_anchor(
        Duration::hours(4),
        9 * 3600,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )
    .unwrap()
}

fn request() -> EvaluationRequest {
    EvaluationRequest {
        bars: bars(),
        lookback: Duration::days(30),
        interval: SampleInterval::Hour1,
        detection: DetectionConfig::default(),
    }
}

/// Candles that end in a BUY trigger: demand block at 1, bullish gap at 2,
/// last candle holds the block low and reaches the gap top (110).
fn buy_candles() -> Vec<Candle> {
    let base = DateTime::parse_from_rfc3339("2024-03-04T09:00:00+09:00").unwrap();
    [
        (101.0, 103.0, 100.0, 101.0),
        (102.0, 103.5, 101.0, 103.0),
        (103.0, 110.0, 102.0, 109.0),
        (109.0, 110.0, 101.2, 105.0),
        (105.0, 110.0, 101.5, 108.0),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(open, high, low, close))| Candle {
        open_time: base + Duration::hours(4 * i as i64),
        open,
        high,
        low,
        close,
        volume: 500,
    })
    .collect()
}

/// Six candles with alternating swings: never an order block.
fn quiet_candles() -> Vec<Candle> {
    let base = DateTime::parse_from_rfc3339("2024-03-04T09:00:00+09:00").unwrap();
    let highs = [10.0, 12.0, 11.0, 13.0, 12.0, 14.0];
    let lows = [5.0, 6.0, 5.0, 7.0, 6.0, 8.0];
    highs
        .iter()
        .zip(lows.iter())
        .enumerate()
        .map(|(i, (&high, &low))| Candle {
            open_time: base + Duration::hours(4 * i as i64),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 100,
        })
        .collect()
}

enum Canned {
    Samples(Vec<Sample>),
    Fail,
}

/// Provider with per-instrument canned answers; unknown ids are not found.
struct MockProvider {
    series: HashMap<String, Canned>,
    calls: AtomicUsize,
    /// Report unavailable once this many fetches have been made.
    refuse_after: Option<usize>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            series: HashMap::new(),
            calls: AtomicUsize::new(0),
            refuse_after: None,
        }
    }

    fn refusing_after(mut self, calls: usize) -> Self {
        self.refuse_after = Some(calls);
        self
    }

    fn with_candles(mut self, id: &str, candles: &[Candle]) -> Self {
        let samples = flatten(candles, bars().duration());
        self.series.insert(id.into(), Canned::Samples(samples));
        self
    }

    fn with_samples(mut self, id: &str, samples: Vec<Sample>) -> Self {
        self.series.insert(id.into(), Canned::Samples(samples));
        self
    }

    fn failing(mut self, id: &str) -> Self {
        self.series.insert(id.into(), Canned::Fail);
        self
    }
}

impl PriceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_series(
        &self,
        instrument: &InstrumentId,
        _lookback: Duration,
        _interval: SampleInterval,
    ) -> Result<FetchResult, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.series.get(instrument.as_str()) {
            Some(Canned::Samples(samples)) => Ok(FetchResult {
                instrument: instrument.clone(),
                samples: samples.clone(),
                source: DataSource::CsvImport,
            }),
            Some(Canned::Fail) => Err(DataError::NetworkUnreachable("connection reset".into())),
            None => Err(DataError::InstrumentNotFound {
                instrument: instrument.to_string(),
            }),
        }
    }

    fn is_available(&self) -> bool {
        self.refuse_after
            .map_or(true, |limit| self.calls.load(Ordering::SeqCst) < limit)
    }
}

struct BrokenSink;

impl NotificationSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 401,
            description: "Unauthorized".into(),
        })
    }
}

fn context<'a>(
    provider: &'a dyn PriceProvider,
    sink: &'a dyn NotificationSink,
    batch: BatchConfig,
) -> ScanContext<'a> {
    ScanContext {
        provider,
        sink,
        session: SessionClock::always_live(),
        request: request(),
        batch,
    }
}

fn ids(list: &str) -> InstrumentList {
    InstrumentList::parse(list).unwrap()
}

#[test]
fn faults_do_not_abort_the_cycle() {
    let unsorted = {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap();
        let s = Sample {
            time: t,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        };
        vec![s, s]
    };
    let provider = MockProvider::new()
        .failing("DOWN")
        .with_samples("EMPTY", Vec::new())
        .with_samples("BROKEN", unsorted)
        .with_candles("SHORT", &buy_candles()[..3])
        .with_candles("QUIET", &quiet_candles())
        .with_candles("BUY", &buy_candles());
    let sink = MemorySink::new();

    for parallel in [false, true] {
        let ctx = context(
            &provider,
            &sink,
            BatchConfig {
                size: 2,
                pause_secs: 0,
                parallel,
            },
        );
        let report = ctx.evaluate(&ids("DOWN\nEMPTY\nBROKEN\nSHORT\nMISSING\nQUIET\nBUY"));

        let tags: Vec<(&str, &str)> = report
            .results
            .iter()
            .map(|r| (r.instrument.as_str(), r.outcome.tag()))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("DOWN", "data_unavailable"),
                ("EMPTY", "data_unavailable"),
                ("BROKEN", "fault"),
                ("SHORT", "insufficient_history"),
                ("MISSING", "data_unavailable"),
                ("QUIET", "no_structure"),
                ("BUY", "triggered"),
            ],
            "parallel = {parallel}"
        );
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 14);
}

#[test]
fn unavailable_provider_skips_remaining_batches() {
    let provider = MockProvider::new()
        .with_candles("A", &quiet_candles())
        .with_candles("B", &quiet_candles())
        .with_candles("C", &buy_candles())
        .with_candles("D", &buy_candles())
        .refusing_after(2);
    let sink = MemorySink::new();
    let ctx = context(
        &provider,
        &sink,
        BatchConfig {
            size: 2,
            pause_secs: 0,
            parallel: false,
        },
    );

    let report = ctx.evaluate(&ids("A\nB\nC\nD\nE"));
    let tags: Vec<(&str, &str)> = report
        .results
        .iter()
        .map(|r| (r.instrument.as_str(), r.outcome.tag()))
        .collect();
    assert_eq!(
        tags,
        vec![
            ("A", "no_structure"),
            ("B", "no_structure"),
            ("C", "data_unavailable"),
            ("D", "data_unavailable"),
            ("E", "data_unavailable"),
        ]
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    let InstrumentOutcome::DataUnavailable { reason } = &report.results[4].outcome else {
        panic!("expected a skip");
    };
    assert!(reason.contains("mock"));
}

#[test]
fn oversized_lookback_is_isolated_per_instrument() {
    let dir = tempfile::tempdir().unwrap();
    let csv = CsvProvider::new(dir.path());
    for id in ["A", "B"] {
        let samples = flatten(&quiet_candles(), bars().duration());
        CsvProvider::write_samples(&csv.path_for(&id.into()), &samples).unwrap();
    }
    let sink = MemorySink::new();
    let mut ctx = context(&csv, &sink, BatchConfig::default());
    ctx.request.lookback = Duration::days(4_000_000_000);

    let report = ctx.evaluate(&ids("A\nB"));
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome.tag() == "data_unavailable"));
}

#[test]
fn triggers_are_sent_as_messages() {
    let provider = MockProvider::new()
        .with_candles("000660.KS", &buy_candles())
        .with_candles("QUIET", &quiet_candles());
    let sink = MemorySink::new();
    let ctx = context(&provider, &sink, BatchConfig::default());

    let report = ctx.evaluate(&ids("QUIET\n000660.KS"));
    let sent = ctx.notify(&report, Utc::now()).unwrap();

    assert_eq!(sent, 1);
    assert_eq!(
        sink.messages(),
        vec!["000660.KS BUY trigger | entry 110.0000 | stop 102.0000"]
    );
    let trigger = report.triggers().next().unwrap();
    assert!(matches!(
        report.results[1].outcome,
        InstrumentOutcome::Triggered(_)
    ));
    assert_eq!(trigger.bar_time, buy_candles()[4].open_time);
}

#[test]
fn quiet_cycle_sends_nothing_detected_notice() {
    let provider = MockProvider::new()
        .with_candles("A", &quiet_candles())
        .failing("B");
    let sink = MemorySink::new();
    let ctx = context(&provider, &sink, BatchConfig::default());

    let report = ctx.evaluate(&ids("A\nB"));
    assert!(!report.has_triggers());
    assert_eq!(ctx.notify(&report, Utc::now()).unwrap(), 1);
    assert_eq!(sink.messages(), vec![NOTHING_DETECTED]);
}

#[test]
fn session_clock_gates_notifications() {
    let provider = MockProvider::new().with_candles("BUY", &buy_candles());
    let sink = MemorySink::new();
    let mut ctx = context(&provider, &sink, BatchConfig::default());
    ctx.session = SessionClock::from_config(
        &SessionConfig {
            enabled: true,
            ..SessionConfig::default()
        },
        9,
    )
    .unwrap();

    let report = ctx.evaluate(&ids("BUY"));

    // Saturday 10:00 KST
    let weekend = Utc.with_ymd_and_hms(2024, 3, 9, 1, 0, 0).unwrap();
    assert_eq!(ctx.notify(&report, weekend).unwrap(), 0);
    assert!(sink.messages().is_empty());

    // Monday 10:00 KST
    let monday = Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap();
    assert_eq!(ctx.notify(&report, monday).unwrap(), 1);
    assert_eq!(sink.messages().len(), 1);
}

#[test]
fn sink_failure_is_fatal() {
    let provider = MockProvider::new().with_candles("BUY", &buy_candles());
    let ctx = context(&provider, &BrokenSink, BatchConfig::default());
    let report = ctx.evaluate(&ids("BUY"));
    assert!(matches!(
        ctx.notify(&report, Utc::now()),
        Err(ScanError::Notify(_))
    ));
}

#[test]
fn run_cycle_reads_instrument_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instruments.txt");
    std::fs::write(&path, "BUY\n\n  QUIET  \nBUY\n").unwrap();

    let provider = MockProvider::new()
        .with_candles("BUY", &buy_candles())
        .with_candles("QUIET", &quiet_candles());
    let sink = MemorySink::new();
    let ctx = context(&provider, &sink, BatchConfig::default());

    let report = ctx.run_cycle(&path).unwrap();
    let order: Vec<&str> = report.results.iter().map(|r| r.instrument.as_str()).collect();
    assert_eq!(order, vec!["BUY", "QUIET"]);
    assert_eq!(sink.messages().len(), 1);

    let missing = dir.path().join("missing.txt");
    assert!(matches!(
        ctx.run_cycle(&missing),
        Err(ScanError::Instruments(_))
    ));

    let empty = dir.path().join("empty.txt");
    std::fs::write(&empty, "\n  \n").unwrap();
    assert!(matches!(ctx.run_cycle(&empty), Err(ScanError::Instruments(_))));
}
