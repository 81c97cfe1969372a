//! The per-session registry: one cubby and one range tracker, passed by
//! reference to whatever acquires, saves or loads data.

use crate::cubby::Cubby;
use crate::domain::{DataTypeInstance, DataTypeKey};
use crate::tracker::RangeTracker;

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub cubby: Cubby,
    pub tracker: RangeTracker,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `instance` the live data for its key.
    ///
    /// Coverage recorded for the data being replaced is dropped, and the new
    /// instance's bounds become the key's only imported and calculated range.
    pub fn replace(&mut self, instance: DataTypeInstance) {
        let key = instance.key();
        let bounds = instance.time_bounds();
        self.tracker.forget(key);
        self.cubby.stash(instance);
        if let Some(bounds) = bounds {
            self.tracker.record_imported(bounds, key);
            self.tracker.record_calculated(bounds, key);
        }
    }

    /// Empty the instance for `key` and forget its coverage.
    pub fn reset(&mut self, key: DataTypeKey) {
        self.cubby.reset(key);
        self.tracker.forget(key);
    }

    /// Drop all cached data and coverage.
    pub fn clear(&mut self) {
        self.cubby.clear();
        self.tracker.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Field, RawData, TimeRange};
    use chrono::{DateTime, TimeZone, Utc};

    const KEY: DataTypeKey = DataTypeKey::Hammerhead;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn ham(times: Vec<DateTime<Utc>>) -> DataTypeInstance {
        let n = times.len();
        let raw = RawData::new(times).with_field("n_ham", Field::scalar(vec![1.0; n]));
        DataTypeInstance::from_raw(KEY, raw).unwrap()
    }

    #[test]
    fn replace_drops_coverage_of_the_old_data() {
        let mut session = Session::new();
        session.replace(ham(vec![at(5, 0), at(5, 12)]));
        session.replace(ham(vec![at(1, 0), at(1, 6)]));

        let jan5 = TimeRange::new(at(5, 2), at(5, 4)).unwrap();
        assert!(session.tracker.is_import_needed_for(&jan5, KEY));
        assert_eq!(
            session.tracker.imported_intervals(KEY),
            &[TimeRange::new(at(1, 0), at(1, 6)).unwrap()]
        );
        assert_eq!(
            session.tracker.get_calculated_range(KEY),
            Some(TimeRange::new(at(1, 0), at(1, 6)).unwrap())
        );
    }

    #[test]
    fn reset_clears_cubby_and_tracker_for_one_key() {
        let mut session = Session::new();
        session.replace(ham(vec![at(1, 0), at(1, 6)]));
        session.tracker.record_imported(
            TimeRange::new(at(1, 0), at(2, 0)).unwrap(),
            DataTypeKey::Orbit,
        );

        session.reset(KEY);
        assert!(session.cubby.grab(KEY).is_none());
        assert!(session.tracker.imported_intervals(KEY).is_empty());
        assert!(session.tracker.get_calculated_range(KEY).is_none());
        assert_eq!(session.tracker.imported_intervals(DataTypeKey::Orbit).len(), 1);
    }
}
