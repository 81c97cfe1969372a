//! Object cache ("cubby"): exactly one live instance per data-type key.
//!
//! The cubby owns the merge contract used by imports and snapshot loads.
//! Every merge builds the complete result before swapping it in, so a reader
//! never sees timestamps re-sorted while a field is still in the old order.

use crate::domain::{DataTypeInstance, DataTypeKey, InstanceError, MergeStats, RawData};
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Cubby {
    instances: HashMap<DataTypeKey, DataTypeInstance>,
}

impl Cubby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` as the live object for its key, returning the
    /// instance it replaced.
    pub fn stash(&mut self, instance: DataTypeInstance) -> Option<DataTypeInstance> {
        debug!("stashing {} ({} samples)", instance.key(), instance.len());
        self.instances.insert(instance.key(), instance)
    }

    /// The live object for `key`, or `None` if it was never populated.
    pub fn grab(&self, key: DataTypeKey) -> Option<&DataTypeInstance> {
        self.instances.get(&key).filter(|inst| !inst.is_empty())
    }

    /// Remove and return the instance for `key`.
    pub fn take(&mut self, key: DataTypeKey) -> Option<DataTypeInstance> {
        self.instances.remove(&key).filter(|inst| !inst.is_empty())
    }

    /// Merge freshly acquired data into the live instance for `key`.
    ///
    /// With `is_segment_merge` the instance is reset first; this marks the
    /// first segment of a multi-segment restore. Otherwise the data merges
    /// into whatever is there, last write wins on equal timestamps.
    ///
    /// Returns `false` (and logs why) instead of failing, leaving the live
    /// instance untouched.
    pub fn update_global_instance(
        &mut self,
        key: DataTypeKey,
        data: RawData,
        is_segment_merge: bool,
    ) -> bool {
        match self.try_update(key, data, is_segment_merge) {
            Ok(stats) => {
                debug!(
                    "{key}: merged {} incoming into {} existing -> {} samples ({} replaced)",
                    stats.incoming, stats.existing, stats.merged, stats.replaced
                );
                true
            }
            Err(e) => {
                warn!("{key}: update rejected: {e}");
                false
            }
        }
    }

    /// [`Self::update_global_instance`] with the typed failure.
    pub fn try_update(
        &mut self,
        key: DataTypeKey,
        data: RawData,
        is_segment_merge: bool,
    ) -> Result<MergeStats, InstanceError> {
        let incoming = DataTypeInstance::from_raw(key, data)?;
        if is_segment_merge {
            let stats = MergeStats {
                existing: self.instances.get(&key).map_or(0, DataTypeInstance::len),
                incoming: incoming.len(),
                merged: incoming.len(),
                replaced: 0,
            };
            self.instances.insert(key, incoming);
            return Ok(stats);
        }
        match self.instances.get_mut(&key) {
            Some(existing) => existing.merge(&incoming),
            None => {
                let stats = MergeStats {
                    existing: 0,
                    incoming: incoming.len(),
                    merged: incoming.len(),
                    replaced: 0,
                };
                self.instances.insert(key, incoming);
                Ok(stats)
            }
        }
    }

    /// Reset the instance for `key` to empty. Tracker coverage is not
    /// touched; [`Session::reset`](crate::session::Session::reset) clears both.
    pub fn reset(&mut self, key: DataTypeKey) {
        if let Some(inst) = self.instances.get_mut(&key) {
            inst.reset();
        }
    }

    /// Keys with a populated instance, in key order.
    pub fn keys(&self) -> Vec<DataTypeKey> {
        let mut keys: Vec<DataTypeKey> = self
            .instances
            .iter()
            .filter(|(_, inst)| !inst.is_empty())
            .map(|(k, _)| *k)
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.values().all(DataTypeInstance::is_empty)
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
