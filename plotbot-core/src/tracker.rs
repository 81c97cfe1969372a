//! Range tracker: which time ranges each data type has already imported or
//! calculated.
//!
//! Intervals are appended as recorded and never coalesced, so every query
//! scans the full list for the key. Overlapping or repeated intervals are
//! harmless.

use crate::domain::{DataTypeKey, TimeError, TimeRange};
use log::{info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    imported: HashMap<DataTypeKey, Vec<TimeRange>>,
    calculated: HashMap<DataTypeKey, Vec<TimeRange>>,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// True unless some imported interval for `key` fully contains `trange`.
    /// An unparseable `trange` answers true.
    pub fn is_import_needed<S: AsRef<str>>(&self, trange: &[S], key: DataTypeKey) -> bool {
        match TimeRange::from_trange(trange) {
            Ok(range) => self.is_import_needed_for(&range, key),
            Err(e) => {
                warn!("coverage lookup for {key} failed ({e}); treating as not imported");
                true
            }
        }
    }

    pub fn is_import_needed_for(&self, range: &TimeRange, key: DataTypeKey) -> bool {
        !covers(&self.imported, range, key)
    }

    /// Same containment rule as [`Self::is_import_needed`], against the
    /// calculated intervals.
    pub fn is_calculation_needed<S: AsRef<str>>(&self, trange: &[S], key: DataTypeKey) -> bool {
        match TimeRange::from_trange(trange) {
            Ok(range) => self.is_calculation_needed_for(&range, key),
            Err(e) => {
                warn!("coverage lookup for {key} failed ({e}); treating as not calculated");
                true
            }
        }
    }

    pub fn is_calculation_needed_for(&self, range: &TimeRange, key: DataTypeKey) -> bool {
        if covers(&self.calculated, range, key) {
            info!("{key}: calculation for {range} already done, skipping");
            false
        } else {
            true
        }
    }

    /// Overall `(min start, max end)` of the calculated intervals.
    pub fn get_calculated_range(&self, key: DataTypeKey) -> Option<TimeRange> {
        hull(&self.calculated, key)
    }

    pub fn get_imported_range(&self, key: DataTypeKey) -> Option<TimeRange> {
        hull(&self.imported, key)
    }

    pub fn imported_intervals(&self, key: DataTypeKey) -> &[TimeRange] {
        self.imported.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    // ── Updates ─────────────────────────────────────────────────────

    /// Parse and append an imported interval. Strings are normalised to UTC
    /// before storage; a range that fails to parse is not stored.
    pub fn update_imported_range<S: AsRef<str>>(
        &mut self,
        trange: &[S],
        key: DataTypeKey,
    ) -> Result<(), TimeError> {
        let range = TimeRange::from_trange(trange)?;
        self.record_imported(range, key);
        Ok(())
    }

    pub fn update_calculated_range<S: AsRef<str>>(
        &mut self,
        trange: &[S],
        key: DataTypeKey,
    ) -> Result<(), TimeError> {
        let range = TimeRange::from_trange(trange)?;
        self.record_calculated(range, key);
        Ok(())
    }

    pub fn record_imported(&mut self, range: TimeRange, key: DataTypeKey) {
        self.imported.entry(key).or_default().push(range);
    }

    pub fn record_calculated(&mut self, range: TimeRange, key: DataTypeKey) {
        self.calculated.entry(key).or_default().push(range);
    }

    /// Forget everything recorded for `key`.
    pub fn forget(&mut self, key: DataTypeKey) {
        self.imported.remove(&key);
        self.calculated.remove(&key);
    }

    pub fn clear(&mut self) {
        self.imported.clear();
        self.calculated.clear();
    }
}

fn covers(map: &HashMap<DataTypeKey, Vec<TimeRange>>, range: &TimeRange, key: DataTypeKey) -> bool {
    map.get(&key)
        .is_some_and(|intervals| intervals.iter().any(|iv| iv.contains(range)))
}

fn hull(map: &HashMap<DataTypeKey, Vec<TimeRange>>, key: DataTypeKey) -> Option<TimeRange> {
    let intervals = map.get(&key)?;
    let (first, rest) = intervals.split_first()?;
    Some(rest.iter().fold(*first, |acc, iv| acc.hull(iv)))
}
