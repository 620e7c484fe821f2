//! CSV price provider — one file per instrument.
//!
//! Layout: `<dir>/<instrument>.csv` with a header row
//! `time,open,high,low,close,volume`, where `time` is RFC 3339.
//!
//! The lookback window is measured back from the last row in the file, not
//! from the wall clock, so an exported snapshot evaluates the same way every
//! time it is read.

use std::path::{Path, PathBuf};

use chrono::Duration;

use super::provider::{
    lookback_start, DataError, DataSource, FetchResult, PriceProvider, Sample, SampleInterval,
};
use crate::domain::InstrumentId;

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, instrument: &InstrumentId) -> PathBuf {
        self.dir.join(format!("{instrument}.csv"))
    }

    /// Read every row of a sample file.
    pub fn read_samples(path: &Path) -> Result<Vec<Sample>, DataError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::Csv(e.to_string()))?;
        reader
            .deserialize::<Sample>()
            .map(|row| row.map_err(|e| DataError::Csv(format!("{}: {e}", path.display()))))
            .collect()
    }

    /// Write samples in the layout `read_samples` expects.
    pub fn write_samples(path: &Path, samples: &[Sample]) -> Result<(), DataError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| DataError::Csv(e.to_string()))?;
        for sample in samples {
            writer
                .serialize(sample)
                .map_err(|e| DataError::Csv(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl PriceProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_series(
        &self,
        instrument: &InstrumentId,
        lookback: Duration,
        _interval: SampleInterval,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(instrument);
        if !path.exists() {
            return Err(DataError::InstrumentNotFound {
                instrument: instrument.to_string(),
            });
        }

        let mut samples = Self::read_samples(&path)?;
        if let Some(last) = samples.last().map(|s| s.time) {
            let cutoff = lookback_start(last, lookback)?;
            samples.retain(|s| s.time > cutoff);
        }

        Ok(FetchResult {
            instrument: instrument.clone(),
            samples,
            source: DataSource::CsvImport,
        })
    }
}
