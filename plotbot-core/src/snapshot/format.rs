//! On-disk envelope and serialized entry types.

use super::{Compression, SnapshotError};
use crate::domain::{
    epoch_nanos, from_epoch_nanos, DataTypeInstance, DataTypeKey, Field, RawData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

pub const MAGIC: [u8; 8] = *b"PBSNAP\0\x01";
pub const FORMAT_VERSION: u32 = 1;

const ZSTD_FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// One instance (or one segment of one) as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedInstance {
    pub class_name: String,
    pub data_type: DataTypeKey,
    /// Epoch nanoseconds, UTC.
    pub times_ns: Vec<i64>,
    pub fields: BTreeMap<String, Field>,
}

impl SerializedInstance {
    /// Deep copy of `instance` for writing. Combined vector fields whose
    /// per-axis components are also present and identical are left out;
    /// load stacks them back from the components.
    pub fn from_instance(instance: &DataTypeInstance) -> Result<Self, SnapshotError> {
        let spec = instance.key().spec();
        let mut fields = instance.fields().clone();
        for v in spec.vectors {
            let Some(combined) = fields.get(v.combined) else {
                continue;
            };
            let parts: Option<Vec<&Field>> = v.components.iter().map(|c| fields.get(*c)).collect();
            let redundant = parts
                .and_then(|parts| Field::stack(&parts).ok())
                .is_some_and(|stacked| stacked.bits_eq(combined));
            if redundant {
                fields.remove(v.combined);
            }
        }
        Ok(Self {
            class_name: spec.class_name.to_string(),
            data_type: instance.key(),
            times_ns: instance
                .times()
                .iter()
                .map(epoch_nanos)
                .collect::<Result<_, _>>()?,
            fields,
        })
    }

    /// Back to a raw payload, with decomposed vector fields re-stacked.
    pub fn into_raw(self) -> RawData {
        let mut raw = RawData {
            times: self.times_ns.into_iter().map(from_epoch_nanos).collect(),
            fields: self.fields,
        };
        raw.reconstruct_vectors(self.data_type.spec());
        raw
    }

    pub fn len(&self) -> usize {
        self.times_ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsMeta {
    pub original_class: DataTypeKey,
    pub segment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotEntry {
    Instance(SerializedInstance),
    SegmentsMeta(SegmentsMeta),
}

/// Everything stored in one snapshot file, keyed by entry name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct SnapshotBody {
    pub entries: BTreeMap<String, SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 8],
    version: u32,
    created_at: DateTime<Utc>,
    /// BLAKE3 of `payload`, hex.
    content_hash: String,
    payload: Vec<u8>,
}

/// A decoded snapshot file.
pub(crate) struct Decoded {
    pub created_at: DateTime<Utc>,
    pub compressed: bool,
    pub body: SnapshotBody,
}

/// Encode `body` and write it to `path` atomically (`.tmp`, then rename).
/// Returns the number of bytes written.
pub(crate) fn write_file(
    path: &Path,
    body: &SnapshotBody,
    compression: Compression,
) -> Result<u64, SnapshotError> {
    let payload = bincode::serialize(body).map_err(|e| SnapshotError::Encode(e.to_string()))?;
    let envelope = Envelope {
        magic: MAGIC,
        version: FORMAT_VERSION,
        created_at: Utc::now(),
        content_hash: blake3::hash(&payload).to_hex().to_string(),
        payload,
    };
    let mut bytes =
        bincode::serialize(&envelope).map_err(|e| SnapshotError::Encode(e.to_string()))?;
    if let Compression::Zstd { level } = compression {
        bytes = zstd::stream::encode_all(&bytes[..], level).map_err(|e| io_err(path, e))?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    fs::write(tmp_path, &bytes).map_err(|e| io_err(tmp_path, e))?;
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        io_err(path, e)
    })?;
    Ok(bytes.len() as u64)
}

/// Read, decompress if needed, verify and decode a snapshot file.
pub(crate) fn read_file(path: &Path) -> Result<Decoded, SnapshotError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SnapshotError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(io_err(path, e)),
    };

    let compressed = raw.starts_with(&ZSTD_FRAME_MAGIC);
    let bytes = if compressed {
        zstd::stream::decode_all(&raw[..]).map_err(|e| SnapshotError::Decode(e.to_string()))?
    } else {
        raw
    };

    if !bytes.starts_with(&MAGIC) {
        return Err(SnapshotError::BadMagic);
    }
    let envelope: Envelope =
        bincode::deserialize(&bytes).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    if envelope.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: envelope.version,
            supported: FORMAT_VERSION,
        });
    }
    let actual = blake3::hash(&envelope.payload).to_hex().to_string();
    if actual != envelope.content_hash {
        return Err(SnapshotError::ChecksumMismatch {
            expected: envelope.content_hash,
            actual,
        });
    }
    let body: SnapshotBody = bincode::deserialize(&envelope.payload)
        .map_err(|e| SnapshotError::Decode(e.to_string()))?;

    Ok(Decoded {
        created_at: envelope.created_at,
        compressed,
        body,
    })
}

fn io_err(path: &Path, source: io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_body() -> SnapshotBody {
        let times = vec![Utc.timestamp_opt(1_700_000_000, 500).unwrap()];
        let raw = RawData::new(times).with_field("n_ham", Field::scalar(vec![f64::NAN]));
        let inst = DataTypeInstance::from_raw(DataTypeKey::Hammerhead, raw).unwrap();
        let mut body = SnapshotBody::default();
        body.entries.insert(
            "ham".into(),
            SnapshotEntry::Instance(SerializedInstance::from_instance(&inst).unwrap()),
        );
        body
    }

    #[test]
    fn uncompressed_file_starts_with_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.pbsnap");
        write_file(&path, &sample_body(), Compression::None).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(&MAGIC));
        let decoded = read_file(&path).unwrap();
        assert!(!decoded.compressed);
        assert_eq!(decoded.body.entries.len(), 1);
        assert!(!dir.path().join("a.pbsnap.tmp").exists());
    }

    #[test]
    fn zstd_is_detected_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.pbsnap.zst");
        write_file(&path, &sample_body(), Compression::Zstd { level: 3 }).unwrap();
        let decoded = read_file(&path).unwrap();
        assert!(decoded.compressed);
        let SnapshotEntry::Instance(inst) = &decoded.body.entries["ham"] else {
            panic!("expected an instance entry");
        };
        assert!(inst.fields["n_ham"].values()[0].is_nan());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_file(&dir.path().join("nope.pbsnap")),
            Err(SnapshotError::NotFound(_))
        ));
    }

    #[test]
    fn foreign_file_has_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.pbsnap");
        fs::write(&path, b"definitely not a snapshot").unwrap();
        assert!(matches!(read_file(&path), Err(SnapshotError::BadMagic)));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.pbsnap");
        write_file(&path, &sample_body(), Compression::None).unwrap();
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            read_file(&path),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn redundant_combined_vector_is_not_stored() {
        let times = vec![Utc.timestamp_opt(0, 0).unwrap()];
        let raw = RawData::new(times)
            .with_field("br", Field::scalar(vec![1.0]))
            .with_field("bt", Field::scalar(vec![2.0]))
            .with_field("bn", Field::scalar(vec![3.0]))
            .with_field("all", Field::vectors(&[[1.0, 2.0, 3.0]]));
        let inst = DataTypeInstance::from_raw(DataTypeKey::MagRtn, raw).unwrap();
        let ser = SerializedInstance::from_instance(&inst).unwrap();
        assert!(!ser.fields.contains_key("all"));
        let back = ser.into_raw();
        assert_eq!(back.fields["all"].values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn combined_vector_without_components_is_kept() {
        let times = vec![Utc.timestamp_opt(0, 0).unwrap()];
        let raw = RawData::new(times).with_field("all", Field::vectors(&[[1.0, 2.0, 3.0]]));
        let inst = DataTypeInstance::from_raw(DataTypeKey::MagRtn, raw).unwrap();
        let ser = SerializedInstance::from_instance(&inst).unwrap();
        assert!(ser.fields.contains_key("all"));
        assert!(!ser.fields.contains_key("br"));
    }
}
