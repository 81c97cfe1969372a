//! Scatter projection of sparse event streams onto a denser grid.

use super::{AlignError, SortedAxis, DEFAULT_FLOOR_FACTOR};
use crate::domain::Field;

/// Filler used when the source has no positive finite value to derive one from.
const FALLBACK_FILLER: f64 = 1e-10;

/// Smallest positive finite value in `values`, scaled by `floor_factor`.
///
/// Keeps log-scale plots of the projected series free of zeros and negatives.
pub fn scatter_filler(values: &[f64], floor_factor: f64) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .min_by(f64::total_cmp)
        .map_or(FALLBACK_FILLER, |min| min * floor_factor)
}

/// Scatter with the default floor factor; see [`upsample_scatter_with_floor`].
pub fn upsample_scatter(
    source_times: &[f64],
    source_values: &[f64],
    target_times: &[f64],
) -> Result<Vec<f64>, AlignError> {
    upsample_scatter_with_floor(source_times, source_values, target_times, DEFAULT_FLOOR_FACTOR)
}

/// Fill the whole target grid with the filler, then write every source value
/// into the target slot nearest its timestamp. Source samples are applied in
/// time order, so when two land on the same slot the later one stays.
/// No values are interpolated between source points.
pub fn upsample_scatter_with_floor(
    source_times: &[f64],
    source_values: &[f64],
    target_times: &[f64],
    floor_factor: f64,
) -> Result<Vec<f64>, AlignError> {
    let out = scatter_rows(
        source_times,
        &Field::scalar(source_values.to_vec()),
        target_times,
        floor_factor,
    )?;
    Ok(out.values().to_vec())
}

pub(super) fn scatter_rows(
    source_times: &[f64],
    source: &Field,
    target_times: &[f64],
    floor_factor: f64,
) -> Result<Field, AlignError> {
    if source.rows() != source_times.len() {
        return Err(AlignError::LengthMismatch {
            times: source_times.len(),
            values: source.rows(),
        });
    }
    let width = source.width();
    let filler = scatter_filler(source.values(), floor_factor);
    let mut values = vec![filler; target_times.len() * width];

    let target_axis = SortedAxis::new(target_times);
    let source_axis = SortedAxis::new(source_times);
    for &src in &source_axis.original {
        if let Some((slot, _)) = target_axis.nearest(source_times[src]) {
            values[slot * width..(slot + 1) * width].copy_from_slice(source.row(src));
        }
    }

    // Width is taken from an existing field, so this cannot be ragged.
    Field::from_rows(width, values).map_err(|_| AlignError::LengthMismatch {
        times: target_times.len(),
        values: 0,
    })
}
