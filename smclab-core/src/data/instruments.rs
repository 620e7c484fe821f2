//! Instrument list — the ordered set of ids a scan cycle walks.
//!
//! Stored as plain text, one id per line. Lines are trimmed, blank lines are
//! skipped, and repeated ids keep their first position. No other validation
//! is applied; an id the provider does not know simply fails at fetch time.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::domain::InstrumentId;

#[derive(Debug, Error)]
pub enum InstrumentListError {
    #[error("read instrument list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("instrument list is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentList {
    ids: Vec<InstrumentId>,
}

impl InstrumentList {
    pub fn from_file(path: &Path) -> Result<Self, InstrumentListError> {
        let content = std::fs::read_to_string(path).map_err(|source| InstrumentListError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, InstrumentListError> {
        Self::from_ids(content.lines())
    }

    pub fn from_ids<I, S>(ids: I) -> Result<Self, InstrumentListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let ids: Vec<InstrumentId> = ids
            .into_iter()
            .filter_map(|line| {
                let id = line.as_ref().trim();
                (!id.is_empty() && seen.insert(id.to_string())).then(|| InstrumentId::new(id))
            })
            .collect();

        if ids.is_empty() {
            return Err(InstrumentListError::Empty);
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[InstrumentId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Consecutive chunks of at most `size` ids (a size of 0 is treated as 1).
    pub fn batches(&self, size: usize) -> impl Iterator<Item = &[InstrumentId]> {
        self.ids.chunks(size.max(1))
    }
}
