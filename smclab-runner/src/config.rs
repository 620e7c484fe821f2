//! Scanner configuration loaded from TOML.
//!
//! Every section is optional and falls back to the defaults below, so an
//! empty file is a valid configuration:
//!
//! ```toml
//! instruments_file = "instruments.txt"
//!
//! [data]
//! provider = "yahoo"          # "yahoo" | "csv" | "synthetic"
//! csv_dir = "data"
//! lookback_days = 30
//! sample_interval = "1h"
//!
//! [aggregation]
//! bar_hours = 4
//! anchor = "09:00"
//! utc_offset_hours = 9
//!
//! [detection]
//! min_candles = 5
//! fvg_min_gap_ratio = 0.01
//!
//! [batch]
//! size = 10
//! pause_secs = 0
//! parallel = true
//!
//! [session]
//! enabled = false
//! open = "09:00"
//! close = "15:30"
//! weekdays_only = true
//!
//! [telegram]
//! token = "..."               # or TELEGRAM_TOKEN
//! chat_id = "..."             # or TELEGRAM_CHAT_ID
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smclab_core::data::SampleInterval;
use smclab_core::{AggregateError, BarSpec, DetectionConfig, EvaluationRequest};

use crate::notify::TelegramConfig;

pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Longest accepted `data.lookback_days` (100 years).
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid time of day '{value}' for {field} (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("bar grid: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Which [`PriceProvider`](smclab_core::data::PriceProvider) a scan reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "csv" => Ok(ProviderKind::Csv),
            "synthetic" => Ok(ProviderKind::Synthetic),
            other => Err(ConfigError::Invalid(format!("unknown provider '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub instruments_file: PathBuf,
    pub data: DataConfig,
    pub aggregation: AggregationConfig,
    pub detection: DetectionSection,
    pub batch: BatchConfig,
    pub session: SessionConfig,
    pub telegram: TelegramSection,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            instruments_file: PathBuf::from("instruments.txt"),
            data: DataConfig::default(),
            aggregation: AggregationConfig::default(),
            detection: DetectionSection::default(),
            batch: BatchConfig::default(),
            session: SessionConfig::default(),
            telegram: TelegramSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub provider: ProviderKind,
    /// Directory holding `<instrument>.csv` files for the CSV provider.
    pub csv_dir: PathBuf,
    pub lookback_days: u32,
    pub sample_interval: SampleInterval,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            csv_dir: PathBuf::from("data"),
            lookback_days: 30,
            sample_interval: SampleInterval::Hour1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub bar_hours: u32,
    /// Local time of day the bar grid is anchored at.
    pub anchor: String,
    pub utc_offset_hours: i32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bar_hours: 4,
            anchor: "09:00".into(),
            utc_offset_hours: 9,
        }
    }
}

impl AggregationConfig {
    pub fn bar_spec(&self) -> Result<BarSpec, ConfigError> {
        if self.bar_hours == 0 {
            return Err(ConfigError::Invalid("aggregation.bar_hours must be positive".into()));
        }
        let anchor = parse_time_of_day("aggregation.anchor", &self.anchor)?;
        Ok(BarSpec::daily_anchor(
            Duration::hours(i64::from(self.bar_hours)),
            offset_secs(self.utc_offset_hours)?,
            anchor,
        )?)
    }
}

/// Whole-hour UTC offset in seconds; only -23..=23 is accepted.
pub fn offset_secs(utc_offset_hours: i32) -> Result<i32, ConfigError> {
    if !(-23..=23).contains(&utc_offset_hours) {
        return Err(ConfigError::Invalid(format!(
            "aggregation.utc_offset_hours must be within -23..=23, got {utc_offset_hours}"
        )));
    }
    Ok(utc_offset_hours * 3600)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSection {
    pub min_candles: usize,
    pub fvg_min_gap_ratio: f64,
}

impl Default for DetectionSection {
    fn default() -> Self {
        let core = DetectionConfig::default();
        Self {
            min_candles: core.min_candles,
            fvg_min_gap_ratio: core.min_gap_ratio,
        }
    }
}

impl DetectionSection {
    pub fn to_detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            min_candles: self.min_candles,
            min_gap_ratio: self.fvg_min_gap_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
    /// Seconds to wait between batches.
    pub pause_secs: u64,
    /// Evaluate the instruments of a batch on the rayon pool.
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 10,
            pause_secs: 0,
            parallel: true,
        }
    }
}

impl BatchConfig {
    pub fn pause(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pause_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// When false, notifications are sent at any time.
    pub enabled: bool,
    pub open: String,
    pub close: String,
    pub weekdays_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            open: "09:00".into(),
            close: "15:30".into(),
            weekdays_only: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl ScanConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults; then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.lookback_days == 0 || self.data.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid(format!(
                "data.lookback_days must be within 1..={MAX_LOOKBACK_DAYS}, got {}",
                self.data.lookback_days
            )));
        }
        if self.batch.size == 0 {
            return Err(ConfigError::Invalid("batch.size must be positive".into()));
        }
        let ratio = self.detection.fvg_min_gap_ratio;
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "detection.fvg_min_gap_ratio must be a non-negative number, got {ratio}"
            )));
        }
        self.aggregation.bar_spec()?;
        parse_time_of_day("session.open", &self.session.open)?;
        parse_time_of_day("session.close", &self.session.close)?;
        Ok(())
    }

    /// Apply `TELEGRAM_TOKEN` / `TELEGRAM_CHAT_ID` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        if let Some(token) = var(TELEGRAM_TOKEN_ENV) {
            self.telegram.token = Some(token);
        }
        if let Some(chat_id) = var(TELEGRAM_CHAT_ID_ENV) {
            self.telegram.chat_id = Some(chat_id);
        }
    }

    /// Telegram credentials, if both token and chat id are set.
    pub fn telegram_config(&self) -> Option<TelegramConfig> {
        match (&self.telegram.token, &self.telegram.chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                token: token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        }
    }

    pub fn evaluation_request(&self) -> Result<EvaluationRequest, ConfigError> {
        Ok(EvaluationRequest {
            bars: self.aggregation.bar_spec()?,
            lookback: Duration::days(i64::from(self.data.lookback_days)),
            interval: self.data.sample_interval,
            detection: self.detection.to_detection_config(),
        })
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`).
pub fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidTime {
            field,
            value: value.to_string(),
        })
}
