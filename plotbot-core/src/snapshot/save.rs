//! Snapshot save.

use super::format::{write_file, SegmentsMeta, SerializedInstance, SnapshotBody, SnapshotEntry};
use super::{Compression, EntryKey, SnapshotError};
use crate::align::segment_by_time_gap;
use crate::domain::{DataTypeKey, TimeRange};
use crate::session::Session;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Keys to save; `None` saves every populated instance.
    pub keys: Option<Vec<DataTypeKey>>,
    /// Keep only samples inside this window (inclusive).
    pub time_filter: Option<TimeRange>,
    /// Split instances on time gaps into separately stored segments.
    pub auto_split: bool,
    pub compression: Compression,
}

#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    pub path: PathBuf,
    pub written: Vec<DataTypeKey>,
    /// Keys stored as segments, with their segment counts.
    pub segmented: Vec<(DataTypeKey, usize)>,
    /// Keys with nothing usable left after filtering.
    pub dropped_empty: Vec<DataTypeKey>,
    /// Requested keys the session has never populated.
    pub missing: Vec<DataTypeKey>,
    pub bytes: u64,
}

/// Write the selected instances from `session` to `path`.
///
/// Works on deep copies, never on the live instances. Instances that end up
/// with no usable samples are left out of the file entirely.
pub fn save_snapshot(
    session: &Session,
    path: &Path,
    options: &SaveOptions,
) -> Result<SaveReport, SnapshotError> {
    let keys = options.keys.clone().unwrap_or_else(|| session.cubby.keys());
    let mut report = SaveReport {
        path: path.to_path_buf(),
        ..SaveReport::default()
    };
    let mut body = SnapshotBody::default();

    for key in keys {
        let Some(live) = session.cubby.grab(key) else {
            warn!("{key}: nothing cached, not saved");
            report.missing.push(key);
            continue;
        };
        let copy = match &options.time_filter {
            Some(range) => live.filtered(range),
            None => live.clone(),
        };
        if !copy.has_usable_data() {
            debug!("{key}: no usable data after filtering, dropped");
            report.dropped_empty.push(key);
            continue;
        }

        let base = key.as_str();
        let groups = if options.auto_split {
            segment_by_time_gap(&copy.epoch_seconds(), None)?.segment_indices()
        } else {
            vec![(0..copy.len()).collect()]
        };

        if groups.len() > 1 {
            for (n, rows) in groups.iter().enumerate() {
                let segment = copy.take_rows(rows);
                let name = EntryKey::Segment {
                    base: base.to_string(),
                    index: n + 1,
                }
                .name();
                body.entries.insert(
                    name,
                    SnapshotEntry::Instance(SerializedInstance::from_instance(&segment)?),
                );
            }
            body.entries.insert(
                EntryKey::Meta(base.to_string()).name(),
                SnapshotEntry::SegmentsMeta(SegmentsMeta {
                    original_class: key,
                    segment_count: groups.len(),
                }),
            );
            debug!("{key}: stored as {} segments", groups.len());
            report.segmented.push((key, groups.len()));
        } else {
            body.entries.insert(
                base.to_string(),
                SnapshotEntry::Instance(SerializedInstance::from_instance(&copy)?),
            );
        }
        report.written.push(key);
    }

    report.bytes = write_file(path, &body, options.compression)?;
    info!(
        "saved {} data type(s) to {} ({} bytes)",
        report.written.len(),
        path.display(),
        report.bytes
    );
    Ok(report)
}
