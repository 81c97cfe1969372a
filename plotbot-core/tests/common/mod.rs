//! Shared fixtures for plotbot-core integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use plotbot_core::domain::{DataTypeInstance, DataTypeKey, Field, RawData};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 9, 28, 0, 0, 0).unwrap()
}

pub fn at_minutes(minutes: &[i64]) -> Vec<DateTime<Utc>> {
    minutes.iter().map(|&m| t0() + Duration::minutes(m)).collect()
}

/// Magnetometer payload carrying both the per-axis components and the
/// combined `all` vector, values derived from the sample index.
pub fn mag_raw(times: Vec<DateTime<Utc>>, offset: f64) -> RawData {
    let n = times.len();
    let br: Vec<f64> = (0..n).map(|i| offset + i as f64).collect();
    let bt: Vec<f64> = br.iter().map(|v| -v).collect();
    let bn: Vec<f64> = br.iter().map(|v| v * 0.25).collect();
    let all: Vec<[f64; 3]> = (0..n).map(|i| [br[i], bt[i], bn[i]]).collect();
    let bmag: Vec<f64> = all
        .iter()
        .map(|r| (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt())
        .collect();
    RawData::new(times)
        .with_field("br", Field::scalar(br))
        .with_field("bt", Field::scalar(bt))
        .with_field("bn", Field::scalar(bn))
        .with_field("all", Field::vectors(&all))
        .with_field("bmag", Field::scalar(bmag))
}

pub fn mag_instance(times: Vec<DateTime<Utc>>, offset: f64) -> DataTypeInstance {
    DataTypeInstance::from_raw(DataTypeKey::MagRtn4sa, mag_raw(times, offset)).unwrap()
}

/// Ten-minute cadence for an hour, one point two hours later, then another
/// hour at ten-minute cadence.
pub fn scenario_b_minutes() -> Vec<i64> {
    let mut m: Vec<i64> = (0..=6).map(|i| i * 10).collect();
    m.push(180);
    m.extend((1..=7).map(|i| 180 + i * 10));
    m
}

/// Hourly proton density on `[from, to)`.
pub fn hourly_density(from: DateTime<Utc>, to: DateTime<Utc>, value: f64) -> RawData {
    let mut times = Vec::new();
    let mut t = from;
    while t < to {
        times.push(t);
        t += Duration::hours(1);
    }
    let n = times.len();
    RawData::new(times).with_field("density", Field::scalar(vec![value; n]))
}
