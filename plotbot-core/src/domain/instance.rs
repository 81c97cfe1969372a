//! Data-type instances: one time axis plus schema-checked fields.
//!
//! Invariant: every field of an instance has exactly `times.len()` rows, and
//! `times` is strictly increasing. Constructors canonicalise (sort, then
//! dedupe with last-write-wins) and every mutating operation re-checks the
//! row-count invariant before it commits.

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::datatype::{DataTypeKey, DataTypeSpec};
use super::time::{to_epoch_seconds, TimeRange};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    #[error("{key} has no field '{field}' (known fields: {allowed})")]
    UnknownField {
        key: DataTypeKey,
        field: String,
        allowed: String,
    },

    #[error("{key}.{field}: expected row width {expected}, got {actual}")]
    WidthMismatch {
        key: DataTypeKey,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{key}.{field}: {actual} rows but {expected} timestamps")]
    LengthInconsistency {
        key: DataTypeKey,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("field of width {width} cannot hold {len} values")]
    RaggedField { width: usize, len: usize },

    #[error("cannot merge {actual} data into a {expected} instance")]
    KeyMismatch {
        expected: DataTypeKey,
        actual: DataTypeKey,
    },

    #[error("{key}: payload has no timestamps")]
    MissingTimestamps { key: DataTypeKey },
}

// ── Field ───────────────────────────────────────────────────────────

/// Row-major `f64` array: `rows * width` values, one row per timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    width: usize,
    values: Vec<f64>,
}

impl Field {
    pub fn scalar(values: Vec<f64>) -> Self {
        Self { width: 1, values }
    }

    pub fn vectors(rows: &[[f64; 3]]) -> Self {
        Self {
            width: 3,
            values: rows.iter().flatten().copied().collect(),
        }
    }

    pub fn from_rows(width: usize, values: Vec<f64>) -> Result<Self, InstanceError> {
        if width == 0 || values.len() % width != 0 {
            return Err(InstanceError::RaggedField {
                width,
                len: values.len(),
            });
        }
        Ok(Self { width, values })
    }

    /// `rows` rows of NaN.
    pub fn nan(width: usize, rows: usize) -> Self {
        Self {
            width,
            values: vec![f64::NAN; width * rows],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.values.len().checked_div(self.width).unwrap_or(0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.width..(i + 1) * self.width]
    }

    /// One column of a multi-column field.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.values
            .chunks_exact(self.width)
            .map(|row| row[j])
            .collect()
    }

    pub fn is_all_nan(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }

    /// Gather rows by index. Indices must be in bounds.
    pub fn take_rows(&self, indices: &[usize]) -> Field {
        let mut values = Vec::with_capacity(indices.len() * self.width);
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }
        Field {
            width: self.width,
            values,
        }
    }

    /// Gather rows by optional index; `None` becomes a NaN row.
    pub fn take_rows_or_nan(&self, indices: &[Option<usize>]) -> Field {
        let mut values = Vec::with_capacity(indices.len() * self.width);
        for idx in indices {
            match idx {
                Some(i) => values.extend_from_slice(self.row(*i)),
                None => values.extend(std::iter::repeat(f64::NAN).take(self.width)),
            }
        }
        Field {
            width: self.width,
            values,
        }
    }

    /// Stack equal-length scalar fields column-wise into one field.
    pub fn stack(columns: &[&Field]) -> Result<Field, InstanceError> {
        let Some(rows) = columns.first().map(|c| c.rows()) else {
            return Err(InstanceError::RaggedField { width: 0, len: 0 });
        };
        for c in columns {
            if c.width != 1 || c.rows() != rows {
                return Err(InstanceError::RaggedField {
                    width: c.width,
                    len: c.values.len(),
                });
            }
        }
        let mut values = Vec::with_capacity(rows * columns.len());
        for i in 0..rows {
            values.extend(columns.iter().map(|c| c.values[i]));
        }
        Ok(Field {
            width: columns.len(),
            values,
        })
    }

    /// Bit-for-bit equality (NaN-aware).
    pub fn bits_eq(&self, other: &Field) -> bool {
        self.width == other.width
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    fn concat(&self, other: &Field) -> Field {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Field {
            width: self.width,
            values,
        }
    }
}

// ── RawData ─────────────────────────────────────────────────────────

/// Payload handed over by a raw data source: timestamps plus named arrays
/// that are expected (not yet checked) to line up with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawData {
    pub times: Vec<DateTime<Utc>>,
    pub fields: BTreeMap<String, Field>,
}

impl RawData {
    pub fn new(times: Vec<DateTime<Utc>>) -> Self {
        Self {
            times,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn time_bounds(&self) -> Option<TimeRange> {
        TimeRange::spanning(&self.times)
    }

    /// Keep only rows whose timestamp falls inside `range`.
    ///
    /// Fields whose row count disagrees with `times` are dropped rather than
    /// sliced, since their rows cannot be matched to timestamps.
    pub fn filtered(&self, range: &TimeRange) -> RawData {
        let keep: Vec<usize> = self
            .times
            .iter()
            .enumerate()
            .filter(|(_, t)| range.contains_instant(t))
            .map(|(i, _)| i)
            .collect();
        RawData {
            times: keep.iter().map(|&i| self.times[i]).collect(),
            fields: self
                .fields
                .iter()
                .filter(|(_, f)| f.rows() == self.times.len())
                .map(|(name, f)| (name.clone(), f.take_rows(&keep)))
                .collect(),
        }
    }

    /// Stack per-axis components back into their combined vector field.
    ///
    /// Driven entirely by the data type's recombination table: a combined
    /// field is rebuilt only when it is absent and every listed component is
    /// present. Returns the names of the fields rebuilt.
    pub fn reconstruct_vectors(&mut self, spec: &DataTypeSpec) -> Vec<&'static str> {
        let mut rebuilt = Vec::new();
        for v in spec.vectors {
            if self.fields.contains_key(v.combined) {
                continue;
            }
            let parts: Option<Vec<&Field>> =
                v.components.iter().map(|c| self.fields.get(*c)).collect();
            let Some(parts) = parts else {
                continue;
            };
            if let Ok(stacked) = Field::stack(&parts) {
                self.fields.insert(v.combined.to_string(), stacked);
                rebuilt.push(v.combined);
            }
        }
        rebuilt
    }
}

// ── DataTypeInstance ────────────────────────────────────────────────

/// Counts describing one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub existing: usize,
    pub incoming: usize,
    pub merged: usize,
    /// Timestamps present on both sides, resolved in favour of the incoming row.
    pub replaced: usize,
}

/// All known data for one data type.
#[derive(Debug, Clone)]
pub struct DataTypeInstance {
    key: DataTypeKey,
    times: Vec<DateTime<Utc>>,
    fields: BTreeMap<String, Field>,
}

impl DataTypeInstance {
    /// An empty instance, as created at session start.
    pub fn new(key: DataTypeKey) -> Self {
        Self {
            key,
            times: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Build an instance from a raw payload.
    ///
    /// Field names and widths are checked against the key's schema, row
    /// counts against the timestamp array. Rows are then sorted by time and
    /// duplicate timestamps collapse to the last occurrence.
    pub fn from_raw(key: DataTypeKey, raw: RawData) -> Result<Self, InstanceError> {
        if raw.times.is_empty() {
            return Err(InstanceError::MissingTimestamps { key });
        }
        let spec = key.spec();
        for (name, field) in &raw.fields {
            check_field(key, spec, name, field)?;
            if field.rows() != raw.times.len() {
                return Err(InstanceError::LengthInconsistency {
                    key,
                    field: name.clone(),
                    expected: raw.times.len(),
                    actual: field.rows(),
                });
            }
        }
        let keep = canonical_order(&raw.times);
        let instance = Self {
            key,
            times: keep.iter().map(|&i| raw.times[i]).collect(),
            fields: raw
                .fields
                .iter()
                .map(|(name, f)| (name.clone(), f.take_rows(&keep)))
                .collect(),
        };
        instance.validate()?;
        Ok(instance)
    }

    pub fn key(&self) -> DataTypeKey {
        self.key
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// False for zero-length instances and for instances whose every field
    /// is entirely NaN (or that carry no fields at all).
    pub fn has_usable_data(&self) -> bool {
        !self.times.is_empty() && self.fields.values().any(|f| !f.is_all_nan())
    }

    pub fn time_bounds(&self) -> Option<TimeRange> {
        match (self.times.first(), self.times.last()) {
            (Some(start), Some(end)) => Some(TimeRange {
                start: *start,
                end: *end,
            }),
            _ => None,
        }
    }

    pub fn epoch_seconds(&self) -> Vec<f64> {
        to_epoch_seconds(&self.times)
    }

    /// Replace or add one field, checked against the schema and row count.
    pub fn set_field(&mut self, name: &str, field: Field) -> Result<(), InstanceError> {
        check_field(self.key, self.key.spec(), name, &field)?;
        if field.rows() != self.times.len() {
            return Err(InstanceError::LengthInconsistency {
                key: self.key,
                field: name.to_string(),
                expected: self.times.len(),
                actual: field.rows(),
            });
        }
        self.fields.insert(name.to_string(), field);
        Ok(())
    }

    /// Check that every field has one row per timestamp.
    ///
    /// A failure is logged at error level: misaligned rows produce wrong
    /// physics downstream without any other visible symptom.
    pub fn validate(&self) -> Result<(), InstanceError> {
        for (name, field) in &self.fields {
            if field.rows() != self.times.len() {
                error!(
                    "length invariant violated for {}.{}: {} rows vs {} timestamps",
                    self.key,
                    name,
                    field.rows(),
                    self.times.len()
                );
                return Err(InstanceError::LengthInconsistency {
                    key: self.key,
                    field: name.clone(),
                    expected: self.times.len(),
                    actual: field.rows(),
                });
            }
        }
        Ok(())
    }

    /// Drop all data, keeping the key.
    pub fn reset(&mut self) {
        self.times.clear();
        self.fields.clear();
    }

    /// Deep copy restricted to rows inside `range` (inclusive).
    pub fn filtered(&self, range: &TimeRange) -> DataTypeInstance {
        let keep: Vec<usize> = self
            .times
            .iter()
            .enumerate()
            .filter(|(_, t)| range.contains_instant(t))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&keep)
    }

    /// Deep copy of the given rows, in the order given.
    pub fn take_rows(&self, indices: &[usize]) -> DataTypeInstance {
        DataTypeInstance {
            key: self.key,
            times: indices.iter().map(|&i| self.times[i]).collect(),
            fields: self
                .fields
                .iter()
                .map(|(name, f)| (name.clone(), f.take_rows(indices)))
                .collect(),
        }
    }

    /// Merge `incoming` into this instance.
    ///
    /// Timestamps from both sides are concatenated (existing first), stably
    /// sorted, and de-duplicated keeping the last row for each timestamp, so
    /// the incoming side wins ties. Every field is reordered with the same
    /// permutation; a field present on only one side is padded with NaN rows
    /// for the other. Nothing is committed unless the result validates.
    pub fn merge(&mut self, incoming: &DataTypeInstance) -> Result<MergeStats, InstanceError> {
        if incoming.key != self.key {
            return Err(InstanceError::KeyMismatch {
                expected: self.key,
                actual: incoming.key,
            });
        }
        let existing = self.len();
        if incoming.is_empty() {
            return Ok(MergeStats {
                existing,
                incoming: 0,
                merged: existing,
                replaced: 0,
            });
        }

        let mut all_times = Vec::with_capacity(existing + incoming.len());
        all_times.extend_from_slice(&self.times);
        all_times.extend_from_slice(&incoming.times);
        let keep = canonical_order(&all_times);

        let names: BTreeSet<&String> = self.fields.keys().chain(incoming.fields.keys()).collect();
        let mut fields = BTreeMap::new();
        for name in names {
            let ours = self.fields.get(name);
            let theirs = incoming.fields.get(name);
            let width = match (ours, theirs) {
                (Some(a), Some(b)) if a.width != b.width => {
                    return Err(InstanceError::WidthMismatch {
                        key: self.key,
                        field: name.clone(),
                        expected: a.width,
                        actual: b.width,
                    });
                }
                (Some(a), _) => a.width,
                (None, Some(b)) => b.width,
                (None, None) => continue,
            };
            let left = ours.cloned().unwrap_or_else(|| Field::nan(width, existing));
            let right = theirs
                .cloned()
                .unwrap_or_else(|| Field::nan(width, incoming.len()));
            fields.insert(name.clone(), left.concat(&right).take_rows(&keep));
        }

        let merged = DataTypeInstance {
            key: self.key,
            times: keep.iter().map(|&i| all_times[i]).collect(),
            fields,
        };
        merged.validate()?;

        let stats = MergeStats {
            existing,
            incoming: incoming.len(),
            merged: merged.len(),
            replaced: existing + incoming.len() - merged.len(),
        };
        *self = merged;
        Ok(stats)
    }

    /// Convert back into a raw payload (the form merges and snapshots exchange).
    pub fn into_raw(self) -> RawData {
        RawData {
            times: self.times,
            fields: self.fields,
        }
    }

    /// Bit-for-bit comparison of times and every field.
    pub fn bits_eq(&self, other: &DataTypeInstance) -> bool {
        self.key == other.key
            && self.times == other.times
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, f)| other.fields.get(name).is_some_and(|g| f.bits_eq(g)))
    }
}

fn check_field(
    key: DataTypeKey,
    spec: &DataTypeSpec,
    name: &str,
    field: &Field,
) -> Result<(), InstanceError> {
    let Some(declared) = spec.field(name) else {
        return Err(InstanceError::UnknownField {
            key,
            field: name.to_string(),
            allowed: spec.field_names().join(", "),
        });
    };
    if declared.width != field.width() {
        return Err(InstanceError::WidthMismatch {
            key,
            field: name.to_string(),
            expected: declared.width,
            actual: field.width(),
        });
    }
    Ok(())
}

/// Row indices that sort `times` ascending, keeping only the last index of
/// each run of equal timestamps.
fn canonical_order(times: &[DateTime<Utc>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for i in order {
        match keep.last_mut() {
            Some(last) if times[*last] == times[i] => *last = i,
            _ => keep.push(i),
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn mag(secs: &[i64], br: &[f64]) -> DataTypeInstance {
        let raw = RawData::new(secs.iter().map(|&s| t(s)).collect())
            .with_field("br", Field::scalar(br.to_vec()))
            .with_field(
                "all",
                Field::vectors(&br.iter().map(|&b| [b, -b, 0.5 * b]).collect::<Vec<_>>()),
            );
        DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw).unwrap()
    }

    #[test]
    fn from_raw_sorts_and_dedupes_last_wins() {
        let inst = mag(&[2, 0, 1, 1], &[20.0, 0.0, 10.0, 11.0]);
        assert_eq!(inst.times(), &[t(0), t(1), t(2)]);
        assert_eq!(inst.field("br").unwrap().values(), &[0.0, 11.0, 20.0]);
        assert_eq!(inst.field("all").unwrap().row(1), &[11.0, -11.0, 5.5]);
    }

    #[test]
    fn from_raw_rejects_unknown_field_with_allowed_list() {
        let raw = RawData::new(vec![t(0)]).with_field("bogus", Field::scalar(vec![1.0]));
        let err = DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("br, bt, bn"));
    }

    #[test]
    fn from_raw_rejects_wrong_width() {
        let raw = RawData::new(vec![t(0)]).with_field("br", Field::vectors(&[[1.0, 2.0, 3.0]]));
        assert!(matches!(
            DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw),
            Err(InstanceError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn from_raw_rejects_length_mismatch() {
        let raw = RawData::new(vec![t(0), t(1)]).with_field("br", Field::scalar(vec![1.0]));
        assert!(matches!(
            DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw),
            Err(InstanceError::LengthInconsistency { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn from_raw_rejects_missing_timestamps() {
        assert!(matches!(
            DataTypeInstance::from_raw(DataTypeKey::Hammerhead, RawData::default()),
            Err(InstanceError::MissingTimestamps { .. })
        ));
    }

    #[test]
    fn merge_disjoint_ranges_concatenates() {
        let mut a = mag(&[0, 1, 2], &[0.0, 1.0, 2.0]);
        let b = mag(&[3, 4], &[3.0, 4.0]);
        let stats = a.merge(&b).unwrap();
        assert_eq!(stats.merged, 5);
        assert_eq!(stats.replaced, 0);
        assert_eq!(a.field("br").unwrap().values(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.field("all").unwrap().rows(), 5);
    }

    #[test]
    fn merge_overlap_keeps_incoming_value() {
        let mut a = mag(&[0, 1, 2], &[0.0, 1.0, 2.0]);
        let b = mag(&[2, 3], &[99.0, 3.0]);
        let stats = a.merge(&b).unwrap();
        assert_eq!(stats.replaced, 1);
        assert_eq!(a.times().len(), 4);
        assert_eq!(a.field("br").unwrap().values(), &[0.0, 1.0, 99.0, 3.0]);
        assert_eq!(a.field("all").unwrap().row(2), &[99.0, -99.0, 49.5]);
    }

    #[test]
    fn merge_interleaved_reorders_every_field_identically() {
        let mut a = mag(&[0, 2, 4], &[0.0, 2.0, 4.0]);
        let b = mag(&[1, 3], &[1.0, 3.0]);
        a.merge(&b).unwrap();
        let br = a.field("br").unwrap().values().to_vec();
        let all_r = a.field("all").unwrap().column(0);
        assert_eq!(br, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(br, all_r);
    }

    #[test]
    fn merge_pads_fields_missing_on_one_side() {
        let mut a = mag(&[0, 1], &[0.0, 1.0]);
        let raw = RawData::new(vec![t(2)]).with_field("bmag", Field::scalar(vec![7.0]));
        let b = DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw).unwrap();
        a.merge(&b).unwrap();
        let bmag = a.field("bmag").unwrap().values();
        assert!(bmag[0].is_nan() && bmag[1].is_nan());
        assert_eq!(bmag[2], 7.0);
        assert!(a.field("br").unwrap().values()[2].is_nan());
        a.validate().unwrap();
    }

    #[test]
    fn merge_rejects_other_key_without_mutating() {
        let mut a = mag(&[0], &[1.0]);
        let other = DataTypeInstance::from_raw(
            DataTypeKey::Hammerhead,
            RawData::new(vec![t(5)]).with_field("n_ham", Field::scalar(vec![1.0])),
        )
        .unwrap();
        assert!(a.merge(&other).is_err());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn filtered_is_inclusive_and_deep() {
        let inst = mag(&[0, 10, 20, 30], &[0.0, 1.0, 2.0, 3.0]);
        let range = TimeRange::new(t(10), t(20)).unwrap();
        let sub = inst.filtered(&range);
        assert_eq!(sub.times(), &[t(10), t(20)]);
        assert_eq!(sub.field("all").unwrap().rows(), 2);
        assert_eq!(inst.len(), 4);
    }

    #[test]
    fn all_nan_instance_is_not_usable() {
        let raw = RawData::new(vec![t(0), t(1)]).with_field("br", Field::nan(1, 2));
        let inst = DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, raw).unwrap();
        assert!(!inst.has_usable_data());
        assert!(!DataTypeInstance::new(DataTypeKey::MagRtn4sa).has_usable_data());
    }

    #[test]
    fn set_field_checks_rows() {
        let mut inst = mag(&[0, 1], &[0.0, 1.0]);
        assert!(inst.set_field("bmag", Field::scalar(vec![1.0])).is_err());
        inst.set_field("bmag", Field::scalar(vec![1.0, 2.0])).unwrap();
        assert_eq!(inst.field("bmag").unwrap().rows(), 2);
    }

    #[test]
    fn reconstruct_vectors_stacks_components_in_table_order() {
        let times: Vec<_> = (0..2).map(|i| t(i)).collect();
        let mut raw = RawData::new(times)
            .with_field("bn", Field::scalar(vec![3.0, 6.0]))
            .with_field("br", Field::scalar(vec![1.0, 4.0]))
            .with_field("bt", Field::scalar(vec![2.0, 5.0]));
        let rebuilt = raw.reconstruct_vectors(DataTypeKey::MagRtn.spec());
        assert_eq!(rebuilt, vec!["all"]);
        assert_eq!(raw.fields["all"].values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn reconstruct_vectors_skips_incomplete_sets() {
        let mut raw = RawData::new(vec![t(0)])
            .with_field("br", Field::scalar(vec![1.0]))
            .with_field("bt", Field::scalar(vec![2.0]));
        assert!(raw.reconstruct_vectors(DataTypeKey::MagRtn.spec()).is_empty());
        assert!(!raw.fields.contains_key("all"));
    }

    #[test]
    fn raw_filtered_keeps_matching_rows() {
        let raw = RawData::new(vec![t(0), t(60), t(120)])
            .with_field("n_ham", Field::scalar(vec![1.0, 2.0, 3.0]));
        let sub = raw.filtered(&TimeRange::new(t(30), t(120) + Duration::seconds(1)).unwrap());
        assert_eq!(sub.times, vec![t(60), t(120)]);
        assert_eq!(sub.fields["n_ham"].values(), &[2.0, 3.0]);
    }

    #[test]
    fn field_from_rows_rejects_ragged() {
        assert!(Field::from_rows(3, vec![1.0, 2.0]).is_err());
        assert!(Field::from_rows(0, vec![]).is_err());
        assert_eq!(Field::from_rows(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap().rows(), 2);
    }
}
