//! Deterministic synthetic data, standing in for a download service.
//!
//! Samples sit on a grid of multiples of the data type's nominal cadence
//! (counted from the Unix epoch), so two overlapping requests produce the
//! same timestamps and the same values where they overlap. Values come from
//! a `StdRng` seeded with BLAKE3 of the key, field and grid index. Combined
//! vector fields are stacked from their generated components.

use super::{DataSource, SourceError};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use plotbot_core::domain::{epoch_seconds, DataTypeKey, Field, RawData, TimeRange};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default cap on samples per fetch.
const DEFAULT_MAX_SAMPLES: usize = 20_000;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    max_samples: usize,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the samples per fetch; the cadence is coarsened to fit.
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: max_samples.max(2),
        }
    }

    /// Grid step for `range`: the nominal cadence, coarsened to a multiple of
    /// it when the range would need more than `max_samples` points.
    fn step_secs(&self, key: DataTypeKey, range: &TimeRange) -> f64 {
        let cadence = key.spec().nominal_cadence_secs;
        let span = range.duration().num_milliseconds() as f64 / 1000.0;
        let needed = span / cadence;
        let limit = (self.max_samples - 1) as f64;
        if needed > limit {
            cadence * (needed / limit).ceil()
        } else {
            cadence
        }
    }
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn covers(&self, _key: DataTypeKey, _range: &TimeRange) -> bool {
        true
    }

    fn fetch(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError> {
        let step = self.step_secs(key, range);
        let start = epoch_seconds(&range.start);
        let end = epoch_seconds(&range.end);
        let first = (start / step).ceil() as i64;
        let last = (end / step).floor() as i64;

        // One extra index on each side absorbs rounding in the grid arithmetic.
        let (indices, times): (Vec<i64>, Vec<DateTime<Utc>>) = (first - 1..=last + 1)
            .map(|k| (k, grid_time(k, step)))
            .filter(|(_, t)| range.contains_instant(t))
            .unzip();

        let spec = key.spec();
        let mut raw = RawData::new(times);
        for field in spec.fields {
            if spec.vector_for_combined(field.name).is_some() {
                continue;
            }
            let seed = field_seed(key, field.name);
            let mut values = Vec::with_capacity(indices.len() * field.width);
            for &k in &indices {
                let mut rng = StdRng::seed_from_u64(seed ^ (k as u64));
                let phase = k as f64 * step / 3600.0;
                for j in 0..field.width {
                    let base = 10.0 + (seed % 90) as f64 + j as f64;
                    let wave = (phase + j as f64).sin() * 0.2 * base;
                    let noise: f64 = rng.gen_range(-0.05..0.05) * base;
                    values.push(base + wave + noise);
                }
            }
            let data = Field::from_rows(field.width, values).map_err(|e| SourceError::Malformed {
                path: key.as_str().into(),
                detail: e.to_string(),
            })?;
            raw.fields.insert(field.name.to_string(), data);
        }
        raw.reconstruct_vectors(spec);
        debug!("synthetic {key}: {} samples at {step}s over {range}", raw.times.len());
        Ok(raw)
    }
}

fn grid_time(k: i64, step: f64) -> DateTime<Utc> {
    let nanos = (k as f64 * step * 1e9).round() as i64;
    DateTime::<Utc>::UNIX_EPOCH + Duration::nanoseconds(nanos)
}

fn field_seed(key: DataTypeKey, field: &str) -> u64 {
    let hash = blake3::hash(format!("{}/{field}", key.as_str()).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
