//! Snapshot load and inspection.

use super::format::{read_file, SegmentsMeta, SerializedInstance, SnapshotBody, SnapshotEntry};
use super::{EntryKey, SnapshotError};
use crate::cubby::Cubby;
use crate::domain::{DataTypeInstance, DataTypeKey, InstanceError, TimeRange};
use crate::session::Session;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Restore only these data types; `None` restores everything.
    pub classes: Option<Vec<DataTypeKey>>,
    /// Reset each segmented key before replaying its first segment. When
    /// off, segments merge into whatever the cubby already holds.
    pub merge_segments: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            classes: None,
            merge_segments: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub created_at: Option<DateTime<Utc>>,
    pub restored: Vec<DataTypeKey>,
    pub segmented: Vec<(DataTypeKey, usize)>,
    /// Entries that held nothing usable.
    pub empty: Vec<String>,
    /// Keys whose data was rejected by the cubby.
    pub failed: Vec<DataTypeKey>,
    /// Entries not restored: unknown names or outside the allow-list.
    pub skipped: Vec<String>,
}

/// Restore a snapshot into `session`.
///
/// Whole entries replace the live instance, along with its tracked
/// coverage. Segmented keys are replayed through [`Cubby::try_update`] in
/// segment-index order, the first segment alone flagged as a segment merge,
/// into a scratch cubby (seeded with a copy of the live instance when
/// `merge_segments` is off). The session is only touched once every segment
/// of the key has been accepted, so a rejected segment leaves the live data
/// as it was.
///
/// The whole file is checked for segment-ordering problems before the
/// session is touched.
pub fn load_snapshot(
    session: &mut Session,
    path: &Path,
    options: &LoadOptions,
) -> Result<LoadReport, SnapshotError> {
    let decoded = read_file(path)?;
    let plan = RestorePlan::build(decoded.body)?;
    let mut report = LoadReport {
        created_at: Some(decoded.created_at),
        skipped: plan.skipped,
        ..LoadReport::default()
    };
    let wanted = |key: &DataTypeKey| options.classes.as_ref().map_or(true, |c| c.contains(key));

    for (key, entry) in plan.whole {
        if !wanted(&key) {
            report.skipped.push(key.as_str().to_string());
            continue;
        }
        let raw = entry.into_raw();
        if raw.is_empty() {
            warn!("{key}: snapshot entry has no samples, nothing to restore");
            report.empty.push(key.as_str().to_string());
            continue;
        }
        match DataTypeInstance::from_raw(key, raw) {
            Ok(instance) if !instance.has_usable_data() => {
                warn!("{key}: snapshot entry holds only missing values, nothing to restore");
                report.empty.push(key.as_str().to_string());
            }
            Ok(instance) => {
                session.replace(instance);
                report.restored.push(key);
            }
            Err(e) => {
                warn!("{key}: snapshot entry rejected: {e}");
                report.failed.push(key);
            }
        }
    }

    for (key, segments) in plan.segmented {
        if !wanted(&key) {
            report.skipped.push(key.as_str().to_string());
            continue;
        }
        let count = segments.len();
        let base = if options.merge_segments {
            None
        } else {
            session.cubby.grab(key).cloned()
        };
        match replay_segments(key, segments, base, options.merge_segments) {
            Ok(Some((instance, span))) => {
                debug!("{key}: replayed {count} segments covering {span}");
                if options.merge_segments {
                    session.replace(instance);
                } else {
                    session.cubby.stash(instance);
                    session.tracker.record_imported(span, key);
                    session.tracker.record_calculated(span, key);
                }
                report.restored.push(key);
                report.segmented.push((key, count));
            }
            Ok(None) => {
                warn!("{key}: every segment is empty, nothing to restore");
                report.empty.push(key.as_str().to_string());
            }
            Err(e) => {
                warn!("{key}: segment rejected, live data kept: {e}");
                report.failed.push(key);
            }
        }
    }

    info!(
        "loaded {} data type(s) from {}",
        report.restored.len(),
        path.display()
    );
    Ok(report)
}

/// Replay `segments` in order into a scratch cubby seeded with `base`, the
/// first non-empty segment flagged as a segment merge when `reset` is set.
/// Returns the resulting instance and the span of the replayed segments, or
/// `None` when every segment was empty.
fn replay_segments(
    key: DataTypeKey,
    segments: Vec<SerializedInstance>,
    base: Option<DataTypeInstance>,
    reset: bool,
) -> Result<Option<(DataTypeInstance, TimeRange)>, InstanceError> {
    let mut scratch = Cubby::new();
    if let Some(base) = base {
        scratch.stash(base);
    }
    let mut first = true;
    let mut span: Option<TimeRange> = None;
    for (n, segment) in segments.into_iter().enumerate() {
        let raw = segment.into_raw();
        let Some(bounds) = raw.time_bounds() else {
            warn!("{key}: segment {} is empty, skipped", n + 1);
            continue;
        };
        scratch.try_update(key, raw, first && reset)?;
        first = false;
        span = Some(span.map_or(bounds, |s| s.hull(&bounds)));
    }
    Ok(span.and_then(|span| scratch.take(key).map(|inst| (inst, span))))
}

// ── Restore plan ────────────────────────────────────────────────────

struct RestorePlan {
    whole: Vec<(DataTypeKey, SerializedInstance)>,
    /// Segments per key, already in index order.
    segmented: Vec<(DataTypeKey, Vec<SerializedInstance>)>,
    skipped: Vec<String>,
}

impl RestorePlan {
    fn build(body: SnapshotBody) -> Result<Self, SnapshotError> {
        let mut whole = Vec::new();
        let mut segments: BTreeMap<DataTypeKey, Vec<(usize, SerializedInstance)>> =
            BTreeMap::new();
        let mut metas: BTreeMap<DataTypeKey, SegmentsMeta> = BTreeMap::new();
        let mut skipped = Vec::new();

        for (name, entry) in body.entries {
            let parsed = EntryKey::parse(&name);
            let Ok(key) = parsed.base().parse::<DataTypeKey>() else {
                warn!("unknown snapshot entry '{name}', skipped");
                skipped.push(name);
                continue;
            };
            match (parsed, entry) {
                (EntryKey::Whole(_), SnapshotEntry::Instance(inst)) => {
                    check_instance(&name, key, &inst)?;
                    whole.push((key, inst));
                }
                (EntryKey::Segment { index, .. }, SnapshotEntry::Instance(inst)) => {
                    check_instance(&name, key, &inst)?;
                    segments.entry(key).or_default().push((index, inst));
                }
                (EntryKey::Meta(_), SnapshotEntry::SegmentsMeta(meta)) => {
                    check_stored(&name, key, meta.original_class)?;
                    metas.insert(key, meta);
                }
                _ => {
                    return Err(SnapshotError::Decode(format!(
                        "entry '{name}' does not match its name"
                    )))
                }
            }
        }

        let mut segmented = Vec::with_capacity(segments.len());
        for (key, mut group) in segments {
            group.sort_by_key(|(index, _)| *index);
            let indices: Vec<usize> = group.iter().map(|(index, _)| *index).collect();
            if indices.iter().copied().ne(1..=group.len()) {
                return Err(ordering(key, format!("segment indices {indices:?} are not 1..={}", group.len())));
            }
            match metas.remove(&key) {
                Some(meta) if meta.segment_count != group.len() => {
                    return Err(ordering(
                        key,
                        format!(
                            "meta records {} segments, file holds {}",
                            meta.segment_count,
                            group.len()
                        ),
                    ));
                }
                Some(_) => {}
                None => warn!("{key}: segments without a segments_meta record"),
            }
            if whole.iter().any(|(k, _)| *k == key) {
                return Err(ordering(key, "stored both whole and segmented".to_string()));
            }
            segmented.push((key, group.into_iter().map(|(_, inst)| inst).collect()));
        }
        if let Some((key, meta)) = metas.into_iter().next() {
            return Err(ordering(
                key,
                format!("meta records {} segments, file holds none", meta.segment_count),
            ));
        }

        Ok(Self {
            whole,
            segmented,
            skipped,
        })
    }
}

fn check_instance(
    entry: &str,
    expected: DataTypeKey,
    inst: &SerializedInstance,
) -> Result<(), SnapshotError> {
    check_stored(entry, expected, inst.data_type)?;
    if DataTypeKey::from_class_name(&inst.class_name) != Some(expected) {
        return Err(SnapshotError::ClassMismatch {
            entry: entry.to_string(),
            class_name: inst.class_name.clone(),
        });
    }
    Ok(())
}

fn check_stored(entry: &str, expected: DataTypeKey, stored: DataTypeKey) -> Result<(), SnapshotError> {
    if expected != stored {
        return Err(SnapshotError::EntryMismatch {
            entry: entry.to_string(),
            stored,
        });
    }
    Ok(())
}

fn ordering(key: DataTypeKey, detail: String) -> SnapshotError {
    SnapshotError::SegmentOrdering {
        base: key.as_str().to_string(),
        detail,
    }
}

// ── Inspection ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Whole,
    Segment(usize),
    Meta { segment_count: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub name: String,
    pub kind: EntryKind,
    pub data_type: DataTypeKey,
    pub samples: usize,
    pub bounds: Option<TimeRange>,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub created_at: DateTime<Utc>,
    pub compressed: bool,
    pub entries: Vec<EntrySummary>,
}

/// Describe a snapshot's contents without restoring anything.
pub fn inspect_snapshot(path: &Path) -> Result<SnapshotSummary, SnapshotError> {
    let decoded = read_file(path)?;
    let entries = decoded
        .body
        .entries
        .into_iter()
        .map(|(name, entry)| {
            let kind = match EntryKey::parse(&name) {
                EntryKey::Segment { index, .. } => EntryKind::Segment(index),
                _ => EntryKind::Whole,
            };
            match entry {
                SnapshotEntry::Instance(inst) => {
                    let data_type = inst.data_type;
                    let fields = inst.fields.keys().cloned().collect();
                    let samples = inst.len();
                    let raw = inst.into_raw();
                    EntrySummary {
                        name,
                        kind,
                        data_type,
                        samples,
                        bounds: raw.time_bounds(),
                        fields,
                    }
                }
                SnapshotEntry::SegmentsMeta(meta) => EntrySummary {
                    name,
                    kind: EntryKind::Meta {
                        segment_count: meta.segment_count,
                    },
                    data_type: meta.original_class,
                    samples: 0,
                    bounds: None,
                    fields: Vec::new(),
                },
            }
        })
        .collect();
    Ok(SnapshotSummary {
        created_at: decoded.created_at,
        compressed: decoded.compressed,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Field, RawData};
    use crate::snapshot::format::write_file;
    use crate::snapshot::Compression;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn segment(secs: &[i64], value: f64) -> SerializedInstance {
        let times = secs
            .iter()
            .map(|&s| Utc.timestamp_opt(1_700_000_000 + s, 0).unwrap())
            .collect();
        let raw = RawData::new(times).with_field("n_ham", Field::scalar(vec![value; secs.len()]));
        let inst = DataTypeInstance::from_raw(DataTypeKey::Hammerhead, raw).unwrap();
        SerializedInstance::from_instance(&inst).unwrap()
    }

    fn write(dir: &TempDir, entries: Vec<(&str, SnapshotEntry)>) -> std::path::PathBuf {
        let path = dir.path().join("s.pbsnap");
        let body = SnapshotBody {
            entries: entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        };
        write_file(&path, &body, Compression::None).unwrap();
        path
    }

    fn meta(count: usize) -> SnapshotEntry {
        SnapshotEntry::SegmentsMeta(SegmentsMeta {
            original_class: DataTypeKey::Hammerhead,
            segment_count: count,
        })
    }

    #[test]
    fn segment_index_gap_is_an_ordering_violation() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            vec![
                ("ham_segment_1", SnapshotEntry::Instance(segment(&[0], 1.0))),
                ("ham_segment_3", SnapshotEntry::Instance(segment(&[9000], 2.0))),
                ("ham_segments_meta", meta(2)),
            ],
        );
        let mut session = Session::new();
        let err = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::SegmentOrdering { .. }));
        assert!(session.cubby.is_empty());
    }

    #[test]
    fn meta_count_mismatch_is_an_ordering_violation() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            vec![
                ("ham_segment_1", SnapshotEntry::Instance(segment(&[0], 1.0))),
                ("ham_segments_meta", meta(2)),
            ],
        );
        let err = load_snapshot(&mut Session::new(), &path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::SegmentOrdering { .. }));
    }

    #[test]
    fn segments_replay_by_index_not_by_name() {
        // Lexically "_segment_10" sorts before "_segment_2".
        let dir = TempDir::new().unwrap();
        let mut entries = Vec::new();
        let names: Vec<String> = (1..=10).map(|n| format!("ham_segment_{n}")).collect();
        for (n, name) in names.iter().enumerate() {
            let start = n as i64 * 10_000;
            entries.push((name.as_str(), SnapshotEntry::Instance(segment(&[start], n as f64))));
        }
        entries.push(("ham_segments_meta", meta(10)));
        let path = write(&dir, entries);

        let mut session = Session::new();
        let report = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap();
        assert_eq!(report.segmented, vec![(DataTypeKey::Hammerhead, 10)]);
        let inst = session.cubby.grab(DataTypeKey::Hammerhead).unwrap();
        assert_eq!(inst.len(), 10);
        assert_eq!(
            inst.field("n_ham").unwrap().values(),
            &(0..10).map(f64::from).collect::<Vec<_>>()[..]
        );
    }

    #[test]
    fn unknown_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            vec![
                ("ham", SnapshotEntry::Instance(segment(&[0, 60], 1.0))),
                ("epad_hr", SnapshotEntry::Instance(segment(&[0], 1.0))),
            ],
        );
        let mut session = Session::new();
        let report = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap();
        assert_eq!(report.restored, vec![DataTypeKey::Hammerhead]);
        assert_eq!(report.skipped, vec!["epad_hr".to_string()]);
    }

    #[test]
    fn allow_list_restricts_restore() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, vec![("ham", SnapshotEntry::Instance(segment(&[0], 1.0)))]);
        let mut session = Session::new();
        let options = LoadOptions {
            classes: Some(vec![DataTypeKey::MagRtn4sa]),
            ..LoadOptions::default()
        };
        let report = load_snapshot(&mut session, &path, &options).unwrap();
        assert!(report.restored.is_empty());
        assert!(session.cubby.grab(DataTypeKey::Hammerhead).is_none());
    }

    #[test]
    fn all_nan_entry_is_reported_empty() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, vec![("ham", SnapshotEntry::Instance(segment(&[0], f64::NAN)))]);
        let mut session = Session::new();
        let report = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap();
        assert_eq!(report.empty, vec!["ham".to_string()]);
        assert!(session.cubby.is_empty());
    }

    #[test]
    fn rejected_segment_keeps_live_instance() {
        let mut session = Session::new();
        let times = (0..100)
            .map(|s| Utc.timestamp_opt(1_600_000_000 + s * 60, 0).unwrap())
            .collect();
        let live = RawData::new(times).with_field("n_ham", Field::scalar(vec![7.0; 100]));
        assert!(session.cubby.update_global_instance(DataTypeKey::Hammerhead, live, false));
        let live_span = session.cubby.grab(DataTypeKey::Hammerhead).unwrap().time_bounds().unwrap();
        session.tracker.record_imported(live_span, DataTypeKey::Hammerhead);

        let mut bad = segment(&[9000], 2.0);
        let values = bad.fields.remove("n_ham").unwrap();
        bad.fields.insert("bogus".to_string(), values);
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            vec![
                ("ham_segment_1", SnapshotEntry::Instance(segment(&[0, 60], 1.0))),
                ("ham_segment_2", SnapshotEntry::Instance(bad)),
                ("ham_segments_meta", meta(2)),
            ],
        );

        let report = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap();
        assert_eq!(report.failed, vec![DataTypeKey::Hammerhead]);
        assert!(report.restored.is_empty());
        let inst = session.cubby.grab(DataTypeKey::Hammerhead).unwrap();
        assert_eq!(inst.len(), 100);
        assert!(inst.field("n_ham").unwrap().values().iter().all(|v| *v == 7.0));
        assert_eq!(
            session.tracker.imported_intervals(DataTypeKey::Hammerhead),
            &[live_span]
        );
    }

    #[test]
    fn whole_entry_replaces_tracked_coverage() {
        let mut session = Session::new();
        let stale = TimeRange::new(
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_600_086_400, 0).unwrap(),
        )
        .unwrap();
        session.tracker.record_imported(stale, DataTypeKey::Hammerhead);
        session.tracker.record_calculated(stale, DataTypeKey::Hammerhead);

        let dir = TempDir::new().unwrap();
        let path = write(&dir, vec![("ham", SnapshotEntry::Instance(segment(&[0, 60], 1.0)))]);
        load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap();

        let restored = TimeRange::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Utc.timestamp_opt(1_700_000_060, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(
            session.tracker.imported_intervals(DataTypeKey::Hammerhead),
            &[restored]
        );
        assert_eq!(session.tracker.get_calculated_range(DataTypeKey::Hammerhead), Some(restored));
        assert!(session.tracker.is_import_needed_for(&stale, DataTypeKey::Hammerhead));
    }

    #[test]
    fn class_name_must_match_entry() {
        let mut inst = segment(&[0], 1.0);
        inst.class_name = "orbit_class".to_string();
        let dir = TempDir::new().unwrap();
        let path = write(&dir, vec![("ham", SnapshotEntry::Instance(inst))]);
        let mut session = Session::new();
        let err = load_snapshot(&mut session, &path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::ClassMismatch { .. }));
        assert!(session.cubby.is_empty());
    }

    #[test]
    fn inspect_lists_every_entry() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            vec![
                ("ham_segment_1", SnapshotEntry::Instance(segment(&[0, 60], 1.0))),
                ("ham_segment_2", SnapshotEntry::Instance(segment(&[90_000], 2.0))),
                ("ham_segments_meta", meta(2)),
            ],
        );
        let summary = inspect_snapshot(&path).unwrap();
        assert!(!summary.compressed);
        assert_eq!(summary.entries.len(), 3);
        assert_eq!(summary.entries[0].kind, EntryKind::Segment(1));
        assert_eq!(summary.entries[0].samples, 2);
        assert_eq!(
            summary.entries[2].kind,
            EntryKind::Meta { segment_count: 2 }
        );
    }
}
