//! Cross-instrument alignment over cached data.
//!
//! Projects one field of a cached data type onto another cached data type's
//! time grid, e.g. proton density onto the hammerhead detection times.

use chrono::{DateTime, Utc};
use plotbot_core::align::{self, AlignError, AlignMethod};
use plotbot_core::domain::{DataTypeKey, Field};
use plotbot_core::session::Session;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignmentError {
    #[error("{0} is not cached")]
    NotCached(DataTypeKey),

    #[error("{key} has no field '{field}'")]
    UnknownField { key: DataTypeKey, field: String },

    #[error("bad field reference '{0}', expected <data type>.<field>")]
    BadRef(String),

    #[error(transparent)]
    Align(#[from] AlignError),
}

/// A `data_type.field` reference, e.g. `spi_sf00_l3_mom.density`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub key: DataTypeKey,
    pub field: String,
}

impl FieldRef {
    pub fn new(key: DataTypeKey, field: impl Into<String>) -> Self {
        Self {
            key,
            field: field.into(),
        }
    }
}

impl FromStr for FieldRef {
    type Err = AlignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, field) = s
            .split_once('.')
            .ok_or_else(|| AlignmentError::BadRef(s.to_string()))?;
        let key: DataTypeKey = key
            .parse()
            .map_err(|_| AlignmentError::BadRef(s.to_string()))?;
        if key.spec().field(field).is_none() {
            return Err(AlignmentError::UnknownField {
                key,
                field: field.to_string(),
            });
        }
        Ok(Self::new(key, field))
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.key, self.field)
    }
}

/// A field resampled onto another data type's timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedField {
    pub source: FieldRef,
    pub target: DataTypeKey,
    pub times: Vec<DateTime<Utc>>,
    pub field: Field,
}

/// Align `source` onto the time grid of the cached `target` instance.
pub fn align_field(
    session: &Session,
    source: &FieldRef,
    target: DataTypeKey,
    method: AlignMethod,
) -> Result<AlignedField, AlignmentError> {
    let src = session
        .cubby
        .grab(source.key)
        .ok_or(AlignmentError::NotCached(source.key))?;
    let values = src
        .field(&source.field)
        .ok_or_else(|| AlignmentError::UnknownField {
            key: source.key,
            field: source.field.clone(),
        })?;
    let grid = session
        .cubby
        .grab(target)
        .ok_or(AlignmentError::NotCached(target))?;

    let field = align::align_field(&src.epoch_seconds(), values, &grid.epoch_seconds(), method)?;
    Ok(AlignedField {
        source: source.clone(),
        target,
        times: grid.times().to_vec(),
        field,
    })
}
