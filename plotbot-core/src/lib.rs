//! Plotbot Core: time-series alignment and caching for PSP instrument data.
//!
//! This crate holds everything that has real invariants:
//! - Domain types (time ranges, the data-type schema table, instances)
//! - The resampling/alignment engine and gap segmentation
//! - The range tracker (imported/calculated coverage per data type)
//! - The cubby (one live instance per data type, with the merge contract)
//! - Snapshot persistence (save, load, inspect)
//!
//! Everything is single-threaded and synchronous. State lives in an explicit
//! [`session::Session`] passed by reference, never in globals.

pub mod align;
pub mod cubby;
pub mod domain;
pub mod session;
pub mod snapshot;
pub mod tracker;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: session state can move to a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::DataTypeInstance>();
        require_sync::<domain::DataTypeInstance>();
        require_send::<domain::RawData>();
        require_sync::<domain::RawData>();
        require_send::<domain::TimeRange>();
        require_sync::<domain::TimeRange>();
        require_send::<cubby::Cubby>();
        require_sync::<cubby::Cubby>();
        require_send::<tracker::RangeTracker>();
        require_sync::<tracker::RangeTracker>();
        require_send::<session::Session>();
        require_sync::<session::Session>();
        require_send::<snapshot::SnapshotError>();
        require_sync::<snapshot::SnapshotError>();
    }

    /// Every data type resolves to exactly one schema and back.
    #[test]
    fn data_type_table_is_total() {
        for key in domain::DataTypeKey::ALL {
            let spec = key.spec();
            assert_eq!(spec.key, key.as_str());
            assert_eq!(key.as_str().parse::<domain::DataTypeKey>().unwrap(), key);
            assert_eq!(
                domain::DataTypeKey::from_class_name(spec.class_name),
                Some(key)
            );
        }
    }
}
