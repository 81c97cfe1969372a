//! Gap-aware segmentation of a single time series.

use super::AlignError;
use std::ops::Range;

/// Upper bound on the gap threshold: one hour.
pub const MAX_GAP_SECS: f64 = 3600.0;

/// Multiple of the median spacing above which a delta counts as a gap.
const GAP_MEDIAN_FACTOR: f64 = 10.0;

/// Result of [`segment_by_time_gap`].
#[derive(Debug, Clone, PartialEq)]
pub struct GapSegmentation {
    /// Permutation that sorts the input timestamps. Apply it to every
    /// parallel array before slicing with `segments`.
    pub order: Vec<usize>,
    /// Ranges into the sorted order. Empty when no delta exceeds the
    /// threshold, meaning the series is a single segment.
    pub segments: Vec<Range<usize>>,
    pub threshold_secs: f64,
}

impl GapSegmentation {
    pub fn is_split(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Original-array indices of each segment, in time order. Always at least
    /// one group for non-empty input, even when no split was needed.
    pub fn segment_indices(&self) -> Vec<Vec<usize>> {
        if self.order.is_empty() {
            return Vec::new();
        }
        if self.segments.is_empty() {
            return vec![self.order.clone()];
        }
        self.segments
            .iter()
            .map(|r| self.order[r.clone()].to_vec())
            .collect()
    }
}

/// `min(10 × median delta, 1 h)`; a non-positive median falls back to 1 h.
pub fn gap_threshold(sorted_times: &[f64]) -> f64 {
    let mut deltas: Vec<f64> = sorted_times.windows(2).map(|w| w[1] - w[0]).collect();
    if deltas.is_empty() {
        return MAX_GAP_SECS;
    }
    deltas.sort_by(f64::total_cmp);
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) / 2.0
    } else {
        deltas[mid]
    };
    if median > 0.0 {
        (GAP_MEDIAN_FACTOR * median).min(MAX_GAP_SECS)
    } else {
        MAX_GAP_SECS
    }
}

/// Split `times` (epoch seconds, any order) wherever consecutive sorted
/// samples are more than [`gap_threshold`] apart.
///
/// `reference` is an auxiliary time array that travels with the primary one
/// (for example a numeric copy kept by the instrument loader). Its length must
/// match exactly: a mismatch is refused instead of truncated.
pub fn segment_by_time_gap(
    times: &[f64],
    reference: Option<&[f64]>,
) -> Result<GapSegmentation, AlignError> {
    if let Some(reference) = reference {
        if reference.len() != times.len() {
            return Err(AlignError::ReferenceMismatch {
                times: times.len(),
                reference: reference.len(),
            });
        }
    }

    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| times[i]).collect();
    let threshold_secs = gap_threshold(&sorted);

    let mut cuts: Vec<usize> = sorted
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[1] - w[0] > threshold_secs)
        .map(|(i, _)| i + 1)
        .collect();

    let segments = if cuts.is_empty() {
        Vec::new()
    } else {
        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push(0);
        bounds.append(&mut cuts);
        bounds.push(sorted.len());
        bounds.windows(2).map(|b| b[0]..b[1]).collect()
    };

    Ok(GapSegmentation {
        order,
        segments,
        threshold_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: &[i64]) -> Vec<f64> {
        m.iter().map(|&m| (m * 60) as f64).collect()
    }

    fn scenario_b() -> Vec<f64> {
        let mut t: Vec<i64> = (0..=6).map(|i| i * 10).collect();
        t.push(180);
        t.extend((1..=7).map(|i| 180 + i * 10));
        minutes(&t)
    }

    #[test]
    fn two_hour_gap_splits_into_two_segments() {
        let seg = segment_by_time_gap(&scenario_b(), None).unwrap();
        assert_eq!(seg.threshold_secs, 3600.0);
        assert_eq!(seg.segments, vec![0..7, 7..15]);
    }

    #[test]
    fn regular_series_is_not_split() {
        let seg = segment_by_time_gap(&minutes(&[0, 1, 2, 3, 4]), None).unwrap();
        assert!(!seg.is_split());
        assert_eq!(seg.segment_indices(), vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn threshold_is_ten_times_median_when_small() {
        let seg = segment_by_time_gap(&[0.0, 1.0, 2.0, 3.0, 20.0, 21.0], None).unwrap();
        assert_eq!(seg.threshold_secs, 10.0);
        assert_eq!(seg.segments, vec![0..4, 4..6]);
    }

    #[test]
    fn unsorted_input_uses_sort_permutation() {
        let times = [21.0, 0.0, 20.0, 1.0, 2.0, 3.0];
        let seg = segment_by_time_gap(&times, None).unwrap();
        let groups = seg.segment_indices();
        assert_eq!(groups, vec![vec![1, 3, 4, 5], vec![2, 0]]);
    }

    #[test]
    fn duplicate_timestamps_fall_back_to_one_hour() {
        let seg = segment_by_time_gap(&[5.0, 5.0, 5.0, 4000.0], None).unwrap();
        assert_eq!(seg.threshold_secs, MAX_GAP_SECS);
        assert_eq!(seg.segments, vec![0..3, 3..4]);
    }

    #[test]
    fn reference_length_mismatch_is_refused() {
        let err = segment_by_time_gap(&[0.0, 1.0], Some(&[0.0])).unwrap_err();
        assert_eq!(err, AlignError::ReferenceMismatch { times: 2, reference: 1 });
        assert!(segment_by_time_gap(&[0.0, 1.0], Some(&[0.0, 1.0])).is_ok());
    }

    #[test]
    fn tiny_inputs_are_single_segment() {
        assert!(segment_by_time_gap(&[], None).unwrap().segment_indices().is_empty());
        assert_eq!(
            segment_by_time_gap(&[7.0], None).unwrap().segment_indices(),
            vec![vec![0]]
        );
    }
}
