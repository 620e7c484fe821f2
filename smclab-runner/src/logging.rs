//! Structured logging setup.
//!
//! Library code only emits `tracing` events; the binary calls [`init`] once.
//! Filter precedence: explicit level, then `RUST_LOG`, then `info`. Logs go to
//! stderr so stdout stays clean for reports and `--dry-run` messages.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Filter directive such as `debug` or `smclab_runner=trace,info`.
    pub level: Option<String>,
    pub json: bool,
}

pub fn build_filter(level: Option<&str>) -> EnvFilter {
    let base = match level {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
            eprintln!("invalid log filter '{directive}': {e}; falling back to info");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // HTTP client internals are noise at info.
    ["hyper=warn", "reqwest=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(base, |filter, directive| filter.add_directive(directive))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(options: &LogOptions) {
    INIT.call_once(|| {
        let filter = build_filter(options.level.as_deref());
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true);

        let installed = if options.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if let Err(e) = installed {
            eprintln!("logging already initialized: {e}");
            return;
        }

        tracing::debug!(level = ?options.level, json = options.json, "logging initialized");
    });
}
