//! SMC Lab CLI — scan, watch, and inspect commands.
//!
//! Commands:
//! - `scan` — evaluate the instrument list once and send trigger messages
//! - `watch` — run a scan at every bar boundary, forever
//! - `inspect` — print the swing labels, order blocks, gap and trigger for one instrument

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use smclab_core::domain::InstrumentId;
use smclab_core::structure::analyze;
use smclab_core::{aggregate, InstrumentOutcome};
use smclab_runner::logging::{self, LogOptions};
use smclab_runner::{
    provider_from_config, until_next_boundary, ConsoleSink, CycleReport, NotificationSink,
    ProviderKind, ScanConfig, ScanContext, SessionClock, TelegramNotifier,
};

#[derive(Parser)]
#[command(
    name = "smclab",
    about = "SMC Lab CLI — smart-money structure scanner with trigger notifications"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. `debug`, `smclab_runner=trace`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Instrument list file (one id per line). Overrides `instruments_file`.
    #[arg(long)]
    instruments: Option<PathBuf>,

    /// Price provider: yahoo, csv, synthetic. Overrides `[data] provider`.
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Print messages to stdout instead of sending them to Telegram.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every instrument once and deliver the results.
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the full cycle report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Send a startup notice, then scan at every bar boundary.
    Watch {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the detector chain for one instrument.
    Inspect {
        /// Instrument id (e.g. 005930.KS).
        instrument: String,

        /// Price provider: yahoo, csv, synthetic. Overrides `[data] provider`.
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogOptions {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let mut config = ScanConfig::load(cli.config.as_deref())
        .with_context(|| "failed to load configuration")?;

    match cli.command {
        Commands::Scan { source, json } => {
            apply_source_overrides(&mut config, &source);
            run_scan(&config, source.dry_run, json)
        }
        Commands::Watch { source } => {
            apply_source_overrides(&mut config, &source);
            run_watch(&config, source.dry_run)
        }
        Commands::Inspect {
            instrument,
            provider,
        } => {
            if let Some(p) = provider {
                config.data.provider = p;
            }
            run_inspect(&config, &instrument)
        }
    }
}

fn apply_source_overrides(config: &mut ScanConfig, source: &SourceArgs) {
    if let Some(path) = &source.instruments {
        config.instruments_file = path.clone();
    }
    if let Some(p) = source.provider {
        config.data.provider = p;
    }
}

fn build_sink(config: &ScanConfig, dry_run: bool) -> Result<Box<dyn NotificationSink>> {
    if dry_run {
        return Ok(Box::new(ConsoleSink));
    }
    let Some(telegram) = config.telegram_config() else {
        bail!(
            "telegram credentials missing: set TELEGRAM_TOKEN and TELEGRAM_CHAT_ID \
             (or [telegram] in the config), or pass --dry-run"
        );
    };
    Ok(Box::new(TelegramNotifier::new(telegram)?))
}

fn run_scan(config: &ScanConfig, dry_run: bool, json: bool) -> Result<()> {
    let provider = provider_from_config(&config.data)?;
    let sink = build_sink(config, dry_run)?;
    let ctx = ScanContext {
        provider: provider.as_ref(),
        sink: sink.as_ref(),
        session: SessionClock::from_config(&config.session, config.aggregation.utc_offset_hours)?,
        request: config.evaluation_request()?,
        batch: config.batch,
    };

    let report = ctx.run_cycle(&config.instruments_file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_watch(config: &ScanConfig, dry_run: bool) -> Result<()> {
    let provider = provider_from_config(&config.data)?;
    let sink = build_sink(config, dry_run)?;
    let request = config.evaluation_request()?;
    let ctx = ScanContext {
        provider: provider.as_ref(),
        sink: sink.as_ref(),
        session: SessionClock::from_config(&config.session, config.aggregation.utc_offset_hours)?,
        request,
        batch: config.batch,
    };

    let notice = smclab_runner::report::startup_notice(&request.bars);
    sink.send(&notice)?;
    tracing::info!(sink = sink.name(), "{notice}");

    loop {
        let now = Utc::now();
        let wait = until_next_boundary(&request.bars, now);
        tracing::info!(
            wait_secs = wait.as_secs(),
            next = %request.bars.next_boundary(now),
            "waiting for next bar boundary"
        );
        std::thread::sleep(wait);

        match ctx.run_cycle(&config.instruments_file) {
            Ok(report) => tracing::info!("cycle finished: {}", report.summary_line()),
            Err(e) => tracing::error!(error = %e, "cycle failed"),
        }
    }
}

fn run_inspect(config: &ScanConfig, instrument: &str) -> Result<()> {
    let provider = provider_from_config(&config.data)?;
    let request = config.evaluation_request()?;
    let id = InstrumentId::from(instrument);

    let fetched = provider
        .fetch_series(&id, request.lookback, request.interval)
        .with_context(|| format!("fetch {id} from {}", provider.name()))?;
    let candles = aggregate(&fetched.samples, &request.bars)?;

    println!("=== {id} ({}, {} samples) ===", provider.name(), fetched.samples.len());
    println!(
        "Bars: {}h anchored at {}",
        request.bars.duration().num_hours(),
        request.bars.anchor().format("%H:%M %:z")
    );
    if candles.len() < request.detection.min_candles {
        println!(
            "Only {} candles; at least {} are needed.",
            candles.len(),
            request.detection.min_candles
        );
        return Ok(());
    }

    let snapshot = analyze(&candles, &request.detection.gap_detector());

    println!();
    println!(
        "{:>4}  {:<25} {:>12} {:>12} {:>12} {:>12}  Swing",
        "#", "Open time", "Open", "High", "Low", "Close"
    );
    for (i, c) in candles.iter().enumerate() {
        let swing = snapshot
            .labels
            .at(i)
            .map(|l| l.notation())
            .unwrap_or_default();
        println!(
            "{i:>4}  {:<25} {:>12.4} {:>12.4} {:>12.4} {:>12.4}  {swing}",
            c.open_time.to_rfc3339(),
            c.open,
            c.high,
            c.low,
            c.close
        );
    }

    println!();
    if snapshot.order_blocks.is_empty() {
        println!("Order blocks: none");
    } else {
        // The most recent block is the one the trigger is evaluated against.
        let active = snapshot.latest_order_block().map(|ob| ob.index);
        println!("Order blocks:");
        for ob in &snapshot.order_blocks {
            let marker = if Some(ob.index) == active { '*' } else { ' ' };
            println!(
                "{marker} {:?} at {} (reference {:.4}, boundary {:.4})",
                ob.kind, ob.index, ob.reference_price, ob.boundary_price
            );
        }
    }

    match &snapshot.gap {
        Some(gap) => println!(
            "Fair value gap: {:?} at {} [{:.4}, {:.4}]",
            gap.kind, gap.candle_index, gap.start_price, gap.end_price
        ),
        None => println!("Fair value gap: none"),
    }

    match &snapshot.outcome {
        Ok(t) => println!(
            "Trigger: {} | entry {:.4} | stop {:.4}",
            t.kind.label(),
            t.entry_price,
            t.stop_price
        ),
        Err(reason) => println!("Trigger: none ({reason:?})"),
    }

    Ok(())
}

fn print_summary(report: &CycleReport) {
    println!("=== Scan Summary ===");
    println!("{}", report.summary_line());

    let triggers: Vec<_> = report.triggers().collect();
    if !triggers.is_empty() {
        println!();
        println!("Triggers:");
        for t in triggers {
            println!(
                "  {:<12} {:<4} entry {:>12.4}  stop {:>12.4}  bar {}",
                t.instrument.as_str(),
                t.kind.label(),
                t.entry_price,
                t.stop_price,
                t.bar_time.format("%Y-%m-%d %H:%M")
            );
        }
    }

    let problems: Vec<_> = report
        .results
        .iter()
        .filter_map(|r| match &r.outcome {
            InstrumentOutcome::DataUnavailable { reason } | InstrumentOutcome::Fault { reason } => {
                Some((r.instrument.as_str(), reason.as_str()))
            }
            _ => None,
        })
        .collect();
    if !problems.is_empty() {
        println!();
        println!("Skipped:");
        for (id, reason) in problems {
            println!("  {id:<12} {reason}");
        }
    }
}
