//! Raw data sources.
//!
//! A source turns `(data type, time range)` into a [`RawData`] payload. The
//! orchestrator does not care where the payload came from; it only relies on
//! every field having one row per timestamp.

mod csv_dir;
mod memory;
mod synthetic;

pub use csv_dir::CsvDirectorySource;
pub use memory::MemorySource;
pub use synthetic::SyntheticSource;

use plotbot_core::domain::{DataTypeKey, RawData, TimeError, TimeRange};
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} has no {key} data")]
    NotAvailable {
        source_name: String,
        key: DataTypeKey,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {detail}")]
    Malformed { path: PathBuf, detail: String },

    #[error(transparent)]
    Time(#[from] TimeError),
}

/// A provider of raw instrument data.
pub trait DataSource {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether this source can be asked for `key` over `range` at all.
    fn covers(&self, key: DataTypeKey, range: &TimeRange) -> bool;

    /// Samples of `key` inside `range`. May return an empty payload.
    fn fetch(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError>;
}

/// Shared sources, so a caller can keep a handle to a source it gave away.
impl<T: DataSource + ?Sized> DataSource for Rc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn covers(&self, key: DataTypeKey, range: &TimeRange) -> bool {
        (**self).covers(key, range)
    }

    fn fetch(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError> {
        (**self).fetch(key, range)
    }
}
