//! Resampling/alignment engine.
//!
//! Stateless functions that project one irregularly sampled series onto
//! another series' time grid, plus gap-based segmentation of a single series.
//! All time arguments are epoch seconds (`f64`); convert with
//! [`crate::domain::to_epoch_seconds`] after normalising to UTC.
//!
//! Missing data is always NaN. Nothing here forward-fills or interpolates.

mod downsample;
mod scatter;
mod segment;

pub use downsample::{
    downsample_nearest_index, downsample_nearest_with_tolerance, nearest_index_matches,
    tolerance_matches,
};
pub use scatter::{scatter_filler, upsample_scatter, upsample_scatter_with_floor};
pub use segment::{gap_threshold, segment_by_time_gap, GapSegmentation, MAX_GAP_SECS};

use crate::domain::Field;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Default multiplier applied to the smallest positive source value to get
/// the scatter filler.
pub const DEFAULT_FLOOR_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error(
        "target grid has {target_len} point(s); a tolerance cannot be derived without a fallback"
    )]
    Undersampled { target_len: usize },

    #[error("{times} source timestamps but {values} source rows")]
    LengthMismatch { times: usize, values: usize },

    #[error("reference time array has {reference} entries, primary has {times}")]
    ReferenceMismatch { times: usize, reference: usize },
}

/// How a field is projected onto a target grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AlignMethod {
    /// Nearest source sample, NaN when farther than the first target spacing.
    NearestWithTolerance { fallback_tolerance: Option<f64> },
    /// Nearest source sample at any distance.
    NearestIndex,
    /// Sparse events dropped onto their nearest target slot; the rest is filler.
    Scatter { floor_factor: f64 },
}

impl Default for AlignMethod {
    fn default() -> Self {
        AlignMethod::NearestWithTolerance {
            fallback_tolerance: None,
        }
    }
}

/// Align every row of `source` onto `target_times` with `method`.
///
/// Works for any field width; vector and spectral fields move whole rows.
pub fn align_field(
    source_times: &[f64],
    source: &Field,
    target_times: &[f64],
    method: AlignMethod,
) -> Result<Field, AlignError> {
    if source.rows() != source_times.len() {
        return Err(AlignError::LengthMismatch {
            times: source_times.len(),
            values: source.rows(),
        });
    }
    match method {
        AlignMethod::NearestWithTolerance { fallback_tolerance } => {
            let matches = tolerance_matches(source_times, target_times, fallback_tolerance)?;
            Ok(source.take_rows_or_nan(&matches))
        }
        AlignMethod::NearestIndex => {
            let matches = nearest_index_matches(source_times, target_times);
            Ok(source.take_rows_or_nan(&matches))
        }
        AlignMethod::Scatter { floor_factor } => {
            scatter::scatter_rows(source_times, source, target_times, floor_factor)
        }
    }
}

// ── Sorted axis ─────────────────────────────────────────────────────

/// Source timestamps sorted ascending, remembering each one's original index.
/// Non-finite timestamps are left out: they can never be nearest to anything.
pub(crate) struct SortedAxis {
    times: Vec<f64>,
    original: Vec<usize>,
}

impl SortedAxis {
    pub(crate) fn new(times: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..times.len()).filter(|&i| times[i].is_finite()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
        Self {
            times: order.iter().map(|&i| times[i]).collect(),
            original: order,
        }
    }

    /// Original index and distance of the sample nearest `t`. Ties between
    /// left and right neighbours go to the earlier sample.
    pub(crate) fn nearest(&self, t: f64) -> Option<(usize, f64)> {
        if self.times.is_empty() || !t.is_finite() {
            return None;
        }
        let pos = self.times.partition_point(|&s| s < t);
        let candidate = match (pos.checked_sub(1), (pos < self.times.len()).then_some(pos)) {
            (Some(left), Some(right)) => {
                let dl = t - self.times[left];
                let dr = self.times[right] - t;
                match dl.partial_cmp(&dr) {
                    Some(Ordering::Greater) => right,
                    _ => left,
                }
            }
            (Some(left), None) => left,
            (None, Some(right)) => right,
            (None, None) => return None,
        };
        Some((self.original[candidate], (self.times[candidate] - t).abs()))
    }
}
