//! Time handling: UTC-normalised instants and coverage ranges.
//!
//! Every timestamp that enters the core is a `DateTime<Utc>`. Naive strings
//! are interpreted as UTC at parse time, so containment checks never compare
//! naive and aware instants.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Naive formats accepted for time-range strings, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d/%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d/%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("unparseable time string '{0}'")]
    Unparseable(String),

    #[error("time range must have exactly 2 elements, got {0}")]
    WrongArity(usize),

    #[error("inverted time range: start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("timestamp {0} cannot be represented as epoch nanoseconds")]
    OutOfRange(DateTime<Utc>),
}

/// Parse a single time string into a UTC instant.
///
/// RFC 3339 strings with an explicit offset are converted to UTC; anything
/// without an offset is taken to already be UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, TimeError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(TimeError::Unparseable(s.to_string()))
}

/// Seconds since the Unix epoch as `f64`, the unit all alignment math uses.
pub fn epoch_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) * 1e-9
}

pub fn to_epoch_seconds(times: &[DateTime<Utc>]) -> Vec<f64> {
    times.iter().map(epoch_seconds).collect()
}

/// Nanoseconds since the Unix epoch (the snapshot wire unit).
pub fn epoch_nanos(t: &DateTime<Utc>) -> Result<i64, TimeError> {
    t.timestamp_nanos_opt().ok_or(TimeError::OutOfRange(*t))
}

pub fn from_epoch_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// A closed `[start, end]` span of UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeError> {
        if start > end {
            return Err(TimeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a `[start, end]` pair of strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// Parse a two-element time-range slice, e.g. `["2023-09-28/06:00", "2023-09-28/07:00"]`.
    pub fn from_trange<S: AsRef<str>>(trange: &[S]) -> Result<Self, TimeError> {
        match trange {
            [start, end] => Self::parse(start.as_ref(), end.as_ref()),
            other => Err(TimeError::WrongArity(other.len())),
        }
    }

    /// Smallest range spanning every instant in `times`. `None` when empty.
    pub fn spanning<'a, I>(times: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a DateTime<Utc>>,
    {
        let mut iter = times.into_iter();
        let first = *iter.next()?;
        let (start, end) = iter.fold((first, first), |(lo, hi), t| (lo.min(*t), hi.max(*t)));
        Some(Self { start, end })
    }

    /// True when `other` lies entirely inside this range (inclusive bounds).
    pub fn contains(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    pub fn contains_instant(&self, t: &DateTime<Utc>) -> bool {
        *t >= self.start && *t <= self.end
    }

    /// Smallest range covering both.
    pub fn hull(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%d/%H:%M:%S%.3f"),
            self.end.format("%Y-%m-%d/%H:%M:%S%.3f")
        )
    }
}
