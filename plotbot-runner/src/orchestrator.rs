//! Acquisition orchestrator.
//!
//! For one `(data type, time range)` request, decides between:
//! 1. Cached: the range tracker (or, failing that, the live instance's own
//!    time bounds) already covers the request
//! 2. Import: the local source has files for the data type
//! 3. Download: a remote source exists and we are not offline; the fetch
//!    window is widened to the data type's file granularity
//! 4. Unavailable: nothing can serve the request
//!
//! New data always goes through `Cubby::update_global_instance` as an
//! ordinary incremental merge, and the tracker records the bounds of what
//! actually arrived rather than what was asked for.

use crate::config::{PlotbotConfig, RemoteKind};
use crate::source::{CsvDirectorySource, DataSource, SourceError, SyntheticSource};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use plotbot_core::domain::{CoverageGranularity, DataTypeKey, RawData, TimeRange};
use plotbot_core::session::Session;
use plotbot_core::snapshot::{save_snapshot, SaveOptions, SaveReport, SnapshotError};
use std::path::Path;
use thiserror::Error;

const DAY_SECS: i64 = 86_400;
const SIX_HOURS_SECS: i64 = 21_600;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no source can provide {key} for {range}")]
    Unavailable { key: DataTypeKey, range: TimeRange },

    #[error("{key}: sources returned no samples inside {range}")]
    NoData { key: DataTypeKey, range: TimeRange },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("{key}: the cache rejected the acquired data (see log)")]
    Rejected { key: DataTypeKey },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What `acquire` would do for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionAction {
    Cached,
    Import,
    Download { window: TimeRange },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquireReport {
    pub key: DataTypeKey,
    pub requested: TimeRange,
    /// The action that produced the data (after any import → download fallback).
    pub action: AcquisitionAction,
    /// Name of the source that served the data, if any was asked.
    pub source: Option<String>,
    /// Samples in the fetched payload (0 when cached).
    pub fetched: usize,
    /// Bounds recorded in the tracker by this call.
    pub recorded: Option<TimeRange>,
}

/// Result of one key in a multi-key acquisition.
#[derive(Debug)]
pub struct KeyOutcome {
    pub key: DataTypeKey,
    pub range: TimeRange,
    pub result: Result<AcquireReport, AcquireError>,
}

#[derive(Debug)]
pub struct PopulatedSave {
    pub acquired: Vec<KeyOutcome>,
    pub save: SaveReport,
}

/// Drives acquisition for a session.
///
/// Holds the sources but never the session; every call borrows the session
/// it works on.
pub struct Orchestrator {
    local: Option<Box<dyn DataSource>>,
    remote: Option<Box<dyn DataSource>>,
    offline: bool,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// An orchestrator with no sources: everything not cached is unavailable.
    pub fn new() -> Self {
        Self {
            local: None,
            remote: None,
            offline: false,
        }
    }

    pub fn with_local(mut self, source: impl DataSource + 'static) -> Self {
        self.local = Some(Box::new(source));
        self
    }

    pub fn with_remote(mut self, source: impl DataSource + 'static) -> Self {
        self.remote = Some(Box::new(source));
        self
    }

    /// Never consult the remote source.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Local CSV directory from `data_dir`, remote per `remote`.
    pub fn from_config(config: &PlotbotConfig) -> Self {
        let orchestrator = Self::new()
            .with_local(CsvDirectorySource::new(&config.data_dir))
            .offline(config.offline);
        match config.remote {
            RemoteKind::None => orchestrator,
            RemoteKind::Synthetic => orchestrator.with_remote(SyntheticSource::new()),
        }
    }

    /// Decide what to do for `key` over `range`, without side effects.
    pub fn plan(
        &self,
        session: &Session,
        key: DataTypeKey,
        range: &TimeRange,
    ) -> AcquisitionAction {
        if !session.tracker.is_import_needed_for(range, key) {
            return AcquisitionAction::Cached;
        }
        // Covers instances restored from a snapshot or stashed directly.
        if instance_covers(session, key, range) {
            return AcquisitionAction::Cached;
        }
        if self.local.as_ref().is_some_and(|s| s.covers(key, range)) {
            return AcquisitionAction::Import;
        }
        match self.download_window(key, range) {
            Some(window) => AcquisitionAction::Download { window },
            None => AcquisitionAction::Unavailable,
        }
    }

    /// Make `key` over `range` available in the session's cubby.
    pub fn acquire(
        &self,
        session: &mut Session,
        key: DataTypeKey,
        range: &TimeRange,
    ) -> Result<AcquireReport, AcquireError> {
        let action = self.plan(session, key, range);
        let mut report = AcquireReport {
            key,
            requested: *range,
            action,
            source: None,
            fetched: 0,
            recorded: None,
        };

        match action {
            AcquisitionAction::Cached => {
                // Satisfied by the instance bounds alone: make the tracker agree.
                if session.tracker.is_import_needed_for(range, key) {
                    if let Some(bounds) = session.cubby.grab(key).and_then(|i| i.time_bounds()) {
                        session.tracker.record_imported(bounds, key);
                        report.recorded = Some(bounds);
                    }
                }
                debug!("{key}: {range} already cached");
                Ok(report)
            }
            AcquisitionAction::Import => {
                let local = self.local.as_deref().ok_or(AcquireError::Unavailable {
                    key,
                    range: *range,
                })?;
                match fetch_non_empty(local, key, range) {
                    Ok(raw) => {
                        report.source = Some(local.name().to_string());
                        ingest(session, key, raw, &mut report)?;
                        Ok(report)
                    }
                    Err(e) => {
                        let Some(window) = self.download_window(key, range) else {
                            return Err(e);
                        };
                        warn!("{key}: import from {} failed ({e}), downloading", local.name());
                        report.action = AcquisitionAction::Download { window };
                        self.download(session, key, &window, &mut report)?;
                        Ok(report)
                    }
                }
            }
            AcquisitionAction::Download { window } => {
                self.download(session, key, &window, &mut report)?;
                Ok(report)
            }
            AcquisitionAction::Unavailable => Err(AcquireError::Unavailable { key, range: *range }),
        }
    }

    /// Acquire every key over `range`; one failure does not stop the rest.
    pub fn acquire_many(
        &self,
        session: &mut Session,
        keys: &[DataTypeKey],
        range: &TimeRange,
    ) -> Vec<KeyOutcome> {
        keys.iter()
            .map(|&key| {
                let result = self.acquire(session, key, range);
                if let Err(e) = &result {
                    warn!("{key}: not loaded: {e}");
                }
                KeyOutcome {
                    key,
                    range: *range,
                    result,
                }
            })
            .collect()
    }

    /// Acquire `keys` over every range in `ranges`, then save a snapshot.
    ///
    /// Acquisition failures are reported in the result but do not stop the
    /// save; whatever the session holds afterwards is written. When
    /// `options.keys` is unset, only `keys` are saved.
    pub fn save_with_population(
        &self,
        session: &mut Session,
        keys: &[DataTypeKey],
        ranges: &[TimeRange],
        options: &SaveOptions,
        path: &Path,
    ) -> Result<PopulatedSave, AcquireError> {
        let mut acquired = Vec::new();
        for range in ranges {
            acquired.extend(self.acquire_many(session, keys, range));
        }
        let mut options = options.clone();
        if options.keys.is_none() {
            options.keys = Some(keys.to_vec());
        }
        let save = save_snapshot(session, path, &options)?;
        Ok(PopulatedSave { acquired, save })
    }

    fn download_window(&self, key: DataTypeKey, range: &TimeRange) -> Option<TimeRange> {
        if self.offline {
            return None;
        }
        let remote = self.remote.as_ref()?;
        let window = widen_to_granularity(range, key.spec().granularity);
        remote.covers(key, &window).then_some(window)
    }

    fn download(
        &self,
        session: &mut Session,
        key: DataTypeKey,
        window: &TimeRange,
        report: &mut AcquireReport,
    ) -> Result<(), AcquireError> {
        let remote = self.remote.as_deref().ok_or(AcquireError::Unavailable {
            key,
            range: report.requested,
        })?;
        let raw = fetch_non_empty(remote, key, window)?;
        report.source = Some(remote.name().to_string());
        ingest(session, key, raw, report)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("local", &self.local.as_ref().map(|s| s.name()))
            .field("remote", &self.remote.as_ref().map(|s| s.name()))
            .field("offline", &self.offline)
            .finish()
    }
}

fn instance_covers(session: &Session, key: DataTypeKey, range: &TimeRange) -> bool {
    session
        .cubby
        .grab(key)
        .and_then(|inst| inst.time_bounds())
        .is_some_and(|bounds| bounds.contains(range))
}

fn fetch_non_empty(
    source: &dyn DataSource,
    key: DataTypeKey,
    range: &TimeRange,
) -> Result<RawData, AcquireError> {
    let raw = source.fetch(key, range)?;
    if raw.is_empty() {
        return Err(AcquireError::NoData { key, range: *range });
    }
    Ok(raw)
}

/// Merge `raw` into the cubby and record what actually arrived.
fn ingest(
    session: &mut Session,
    key: DataTypeKey,
    raw: RawData,
    report: &mut AcquireReport,
) -> Result<(), AcquireError> {
    let Some(bounds) = raw.time_bounds() else {
        return Err(AcquireError::NoData {
            key,
            range: report.requested,
        });
    };
    report.fetched = raw.times.len();
    if !session.cubby.update_global_instance(key, raw, false) {
        return Err(AcquireError::Rejected { key });
    }
    session.tracker.record_imported(bounds, key);
    report.recorded = Some(bounds);
    info!(
        "{key}: {} samples from {} covering {bounds}",
        report.fetched,
        report.source.as_deref().unwrap_or("?")
    );
    Ok(())
}

/// Widen `range` outward to the file boundaries of `granularity`.
pub fn widen_to_granularity(range: &TimeRange, granularity: CoverageGranularity) -> TimeRange {
    let block = match granularity {
        CoverageGranularity::Daily => DAY_SECS,
        CoverageGranularity::SixHourly => SIX_HOURS_SECS,
        CoverageGranularity::Unbounded => return *range,
    };
    TimeRange {
        start: floor_to(range.start, block),
        end: ceil_to(range.end, block),
    }
}

fn floor_to(t: DateTime<Utc>, block_secs: i64) -> DateTime<Utc> {
    let rem = t.timestamp().rem_euclid(block_secs);
    t - Duration::seconds(rem) - Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos()))
}

fn ceil_to(t: DateTime<Utc>, block_secs: i64) -> DateTime<Utc> {
    let floor = floor_to(t, block_secs);
    if floor == t {
        t
    } else {
        floor + Duration::seconds(block_secs)
    }
}
