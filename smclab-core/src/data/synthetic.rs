//! Synthetic price provider for offline runs and demos.
//!
//! Produces a random walk from a starting price of 100.0, seeded from the
//! instrument id so the same instrument always yields the same series.
//! Output is tagged `DataSource::Synthetic`.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{
    lookback_start, DataError, DataSource, FetchResult, PriceProvider, Sample, SampleInterval,
};
use crate::domain::InstrumentId;

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    /// Fixed series end; `None` means "now", truncated to the sample interval.
    end: Option<DateTime<Utc>>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the last sample time (useful for reproducible tests).
    pub fn with_end(end: DateTime<Utc>) -> Self {
        Self { end: Some(end) }
    }

    pub fn generate(
        instrument: &InstrumentId,
        end: DateTime<Utc>,
        lookback: Duration,
        interval: SampleInterval,
    ) -> Vec<Sample> {
        let seed: [u8; 32] = *blake3::hash(instrument.as_str().as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let step = interval.duration().num_seconds();
        let count = (lookback.num_seconds() / step).max(0);
        let start = end - Duration::seconds(step * count);

        let mut samples = Vec::with_capacity(count as usize);
        let mut price = 100.0_f64;
        for i in 1..=count {
            let ret: f64 = rng.gen_range(-0.006..0.006);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.003));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.003));

            samples.push(Sample {
                time: start + Duration::seconds(step * i),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(1_000..50_000u64),
            });
            price = close;
        }
        samples
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_series(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        interval: SampleInterval,
    ) -> Result<FetchResult, DataError> {
        let end = match self.end {
            Some(end) => end,
            None => Utc::now()
                .duration_trunc(interval.duration())
                .map_err(|e| DataError::Other(format!("cannot align synthetic clock: {e}")))?,
        };

        lookback_start(end, lookback)?;

        tracing::debug!(%instrument, "generating synthetic samples");
        Ok(FetchResult {
            instrument: instrument.clone(),
            samples: Self::generate(instrument, end, lookback, interval),
            source: DataSource::Synthetic,
        })
    }
}
