//! In-memory source, mostly for tests and for feeding already-parsed data.

use super::{DataSource, SourceError};
use plotbot_core::domain::{DataTypeKey, RawData, TimeRange};
use std::cell::Cell;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemorySource {
    name: String,
    data: HashMap<DataTypeKey, RawData>,
    fetches: Cell<usize>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with(mut self, key: DataTypeKey, raw: RawData) -> Self {
        self.data.insert(key, raw);
        self
    }

    pub fn insert(&mut self, key: DataTypeKey, raw: RawData) {
        self.data.insert(key, raw);
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    /// True when at least one stored sample falls inside `range`.
    fn covers(&self, key: DataTypeKey, range: &TimeRange) -> bool {
        self.data
            .get(&key)
            .is_some_and(|raw| raw.times.iter().any(|t| range.contains_instant(t)))
    }

    fn fetch(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        self.data
            .get(&key)
            .map(|raw| raw.filtered(range))
            .ok_or_else(|| SourceError::NotAvailable {
                source_name: self.name.clone(),
                key,
            })
    }
}
