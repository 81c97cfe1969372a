//! Nearest-neighbour downsampling onto a coarser (or any) target grid.

use super::{AlignError, SortedAxis};

/// Per-target source index, `None` where the nearest source sample lies
/// strictly farther than the tolerance.
///
/// The tolerance is `target_times[1] - target_times[0]`, the first spacing of
/// the target grid, applied uniformly to the whole call. With fewer than two
/// target points `fallback_tolerance` is used instead; without one the call
/// fails with [`AlignError::Undersampled`]. An empty target is not an error.
pub fn tolerance_matches(
    source_times: &[f64],
    target_times: &[f64],
    fallback_tolerance: Option<f64>,
) -> Result<Vec<Option<usize>>, AlignError> {
    let tolerance = match target_times {
        [] => return Ok(Vec::new()),
        [first, second, ..] => (second - first).abs(),
        [_] => fallback_tolerance.ok_or(AlignError::Undersampled {
            target_len: target_times.len(),
        })?,
    };

    let axis = SortedAxis::new(source_times);
    Ok(target_times
        .iter()
        .map(|&t| match axis.nearest(t) {
            Some((idx, dist)) if dist <= tolerance => Some(idx),
            _ => None,
        })
        .collect())
}

/// Per-target index of the globally nearest source sample, at any distance.
/// `None` only when the source has no finite timestamps.
pub fn nearest_index_matches(source_times: &[f64], target_times: &[f64]) -> Vec<Option<usize>> {
    let axis = SortedAxis::new(source_times);
    target_times
        .iter()
        .map(|&t| axis.nearest(t).map(|(idx, _)| idx))
        .collect()
}

/// Scalar nearest-match with tolerance; see [`tolerance_matches`].
pub fn downsample_nearest_with_tolerance(
    source_times: &[f64],
    source_values: &[f64],
    target_times: &[f64],
    fallback_tolerance: Option<f64>,
) -> Result<Vec<f64>, AlignError> {
    check_lengths(source_times, source_values)?;
    let matches = tolerance_matches(source_times, target_times, fallback_tolerance)?;
    Ok(gather(source_values, &matches))
}

/// Scalar nearest-index match: every target point gets the closest source
/// value no matter how far away it is. An empty source yields all NaN.
pub fn downsample_nearest_index(
    source_times: &[f64],
    source_values: &[f64],
    target_times: &[f64],
) -> Result<Vec<f64>, AlignError> {
    check_lengths(source_times, source_values)?;
    let matches = nearest_index_matches(source_times, target_times);
    Ok(gather(source_values, &matches))
}

fn check_lengths(times: &[f64], values: &[f64]) -> Result<(), AlignError> {
    if times.len() != values.len() {
        return Err(AlignError::LengthMismatch {
            times: times.len(),
            values: values.len(),
        });
    }
    Ok(())
}

fn gather(values: &[f64], matches: &[Option<usize>]) -> Vec<f64> {
    matches
        .iter()
        .map(|m| m.map_or(f64::NAN, |i| values[i]))
        .collect()
}
