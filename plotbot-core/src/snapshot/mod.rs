//! Snapshot persistence: save a set of live instances to one file and
//! restore them into a [`Session`](crate::session::Session).
//!
//! Logical layout of a snapshot (the compatibility contract):
//!
//! - `{key}`: one whole instance,
//! - `{key}_segment_{n}`: segment `n` (1-indexed, time order) of an instance
//!   that was split on gaps,
//! - `{key}_segments_meta`: `{original_class, segment_count}` for that split.
//!
//! Byte layout: a bincode envelope (magic, version, creation time, BLAKE3
//! hash of the payload, payload), optionally wrapped in a zstd frame. The
//! frame is detected on load, so readers never need to be told.

mod format;
mod load;
mod save;

pub use format::{SegmentsMeta, SerializedInstance, SnapshotEntry, FORMAT_VERSION, MAGIC};
pub use load::{inspect_snapshot, load_snapshot, EntryKind, EntrySummary, LoadOptions, LoadReport, SnapshotSummary};
pub use save::{save_snapshot, SaveOptions, SaveReport};

use crate::align::AlignError;
use crate::domain::{DataTypeKey, InstanceError, TimeError};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const SNAPSHOT_EXTENSION: &str = "pbsnap";

const SEGMENT_INFIX: &str = "_segment_";
const META_SUFFIX: &str = "_segments_meta";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    #[error("not a snapshot file (bad magic)")]
    BadMagic,

    #[error("unsupported snapshot version {found} (this build reads {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("snapshot payload hash mismatch: header {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("segment ordering violation for '{base}': {detail}")]
    SegmentOrdering { base: String, detail: String },

    #[error("entry '{entry}' holds {stored} data")]
    EntryMismatch { entry: String, stored: DataTypeKey },

    #[error("entry '{entry}' carries class '{class_name}'")]
    ClassMismatch { entry: String, class_name: String },

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Align(#[from] AlignError),
}

/// Compression applied to the whole snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    #[default]
    None,
    Zstd { level: i32 },
}

/// Default file name for a snapshot label: `{label}.pbsnap`, plus `.zst`
/// when compressed.
pub fn snapshot_file_name(label: &str, compression: Compression) -> String {
    match compression {
        Compression::None => format!("{label}.{SNAPSHOT_EXTENSION}"),
        Compression::Zstd { .. } => format!("{label}.{SNAPSHOT_EXTENSION}.zst"),
    }
}

// ── Entry names ─────────────────────────────────────────────────────

/// A parsed snapshot entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    Whole(String),
    Segment { base: String, index: usize },
    Meta(String),
}

impl EntryKey {
    pub fn parse(name: &str) -> EntryKey {
        if let Some(base) = name.strip_suffix(META_SUFFIX) {
            return EntryKey::Meta(base.to_string());
        }
        if let Some(pos) = name.rfind(SEGMENT_INFIX) {
            let digits = &name[pos + SEGMENT_INFIX.len()..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = digits.parse() {
                    return EntryKey::Segment {
                        base: name[..pos].to_string(),
                        index,
                    };
                }
            }
        }
        EntryKey::Whole(name.to_string())
    }

    pub fn base(&self) -> &str {
        match self {
            EntryKey::Whole(base) | EntryKey::Meta(base) => base,
            EntryKey::Segment { base, .. } => base,
        }
    }

    pub fn name(&self) -> String {
        match self {
            EntryKey::Whole(base) => base.clone(),
            EntryKey::Segment { base, index } => format!("{base}{SEGMENT_INFIX}{index}"),
            EntryKey::Meta(base) => format!("{base}{META_SUFFIX}"),
        }
    }
}
