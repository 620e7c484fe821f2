//! SMC Lab Runner — scan cycles, notifications, scheduling, configuration.
//!
//! This crate builds on `smclab-core` to provide:
//! - TOML configuration with environment overrides for secrets
//! - Logging setup (`tracing-subscriber`)
//! - The scan cycle: batching, parallel evaluation, fault isolation
//! - Cycle reports and notification text
//! - Notification sinks (Telegram, console, in-memory)
//! - The session clock and next-boundary scheduling

pub mod config;
pub mod logging;
pub mod notify;
pub mod report;
pub mod scan;
pub mod session;

pub use config::{ConfigError, ProviderKind, ScanConfig};
pub use logging::LogOptions;
pub use notify::{
    ConsoleSink, MemorySink, NotificationSink, NotifyError, TelegramConfig, TelegramNotifier,
};
pub use report::{trigger_message, CycleReport, InstrumentResult, NOTHING_DETECTED};
pub use scan::{provider_from_config, ScanContext, ScanError};
pub use session::{until_next_boundary, SessionClock};
