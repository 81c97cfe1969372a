//! Already-downloaded files: one CSV per data type in a directory.
//!
//! Layout: `{dir}/{key}.csv`, e.g. `data/mag_RTN_4sa.csv`. The header has a
//! `time` column plus one column per scalar field; a field of width N is
//! spread over columns `{field}_0` .. `{field}_{N-1}`. Empty cells are NaN.
//! Columns the data type does not declare are ignored with a warning.

use super::{DataSource, SourceError};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use plotbot_core::domain::{parse_time, DataTypeKey, Field, RawData, TimeRange};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

/// Where one CSV column lands: `(field, component)`.
type ColumnTarget = (&'static str, usize);

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{key}.csv`
    pub fn path_for(&self, key: DataTypeKey) -> PathBuf {
        self.dir.join(format!("{}.csv", key.as_str()))
    }

    fn read(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError> {
        let path = self.path_for(key);
        let spec = key.spec();
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(&path)
            .map_err(|source| csv_err(&path, source))?;

        let headers = reader
            .headers()
            .map_err(|source| csv_err(&path, source))?
            .clone();
        let time_col = headers
            .iter()
            .position(|h| h == "time")
            .ok_or_else(|| SourceError::Malformed {
                path: path.clone(),
                detail: "no 'time' column".into(),
            })?;

        let mut targets: Vec<Option<ColumnTarget>> = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            if i == time_col {
                targets.push(None);
                continue;
            }
            let target = column_target(key, header);
            if target.is_none() {
                warn!("{}: ignoring column '{header}' not declared for {key}", path.display());
            }
            targets.push(target);
        }

        // Every component of a declared multi-column field must be present.
        let mut seen: BTreeMap<&'static str, Vec<bool>> = BTreeMap::new();
        for (field, comp) in targets.iter().flatten() {
            let width = spec.field(field).map_or(1, |f| f.width);
            seen.entry(*field).or_insert_with(|| vec![false; width])[*comp] = true;
        }
        if let Some((field, _)) = seen.iter().find(|(_, cols)| cols.iter().any(|c| !c)) {
            return Err(SourceError::Malformed {
                path: path.clone(),
                detail: format!("field '{field}' is missing some of its component columns"),
            });
        }

        let mut times = Vec::new();
        let mut columns: BTreeMap<&'static str, Vec<f64>> =
            seen.keys().map(|field| (*field, Vec::new())).collect();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|source| csv_err(&path, source))?;
            let t = parse_time(record.get(time_col).unwrap_or_default())?;
            if !range.contains_instant(&t) {
                continue;
            }
            let row = times.len();
            times.push(t);
            for (field, cols) in &seen {
                if let Some(values) = columns.get_mut(field) {
                    values.resize((row + 1) * cols.len(), f64::NAN);
                }
            }
            for (i, target) in targets.iter().enumerate() {
                let Some((field, comp)) = target else {
                    continue;
                };
                let cell = record.get(i).unwrap_or_default();
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse::<f64>().map_err(|e| SourceError::Malformed {
                        path: path.clone(),
                        detail: format!("line {}: column '{}': {e}", line + 2, &headers[i]),
                    })?
                };
                let width = seen.get(field).map_or(1, Vec::len);
                if let Some(values) = columns.get_mut(field) {
                    values[row * width + comp] = value;
                }
            }
        }

        let mut raw = RawData::new(times);
        for (field, values) in columns {
            let width = spec.field(field).map_or(1, |f| f.width);
            let field_data = Field::from_rows(width, values).map_err(|e| SourceError::Malformed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            raw.fields.insert(field.to_string(), field_data);
        }
        debug!(
            "{}: {} rows of {key} inside {range}",
            path.display(),
            raw.times.len()
        );
        Ok(raw)
    }
}

impl DataSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv"
    }

    fn covers(&self, key: DataTypeKey, _range: &TimeRange) -> bool {
        self.path_for(key).is_file()
    }

    fn fetch(&self, key: DataTypeKey, range: &TimeRange) -> Result<RawData, SourceError> {
        if !self.path_for(key).is_file() {
            return Err(SourceError::NotAvailable {
                source_name: self.name().to_string(),
                key,
            });
        }
        self.read(key, range)
    }
}

/// Map a CSV header to the field/component it fills.
fn column_target(key: DataTypeKey, header: &str) -> Option<ColumnTarget> {
    let spec = key.spec();
    if let Some(field) = spec.field(header) {
        return (field.width == 1).then_some((field.name, 0));
    }
    let (name, index) = header.rsplit_once('_')?;
    let index: usize = index.parse().ok()?;
    let field = spec.field(name)?;
    (field.width > 1 && index < field.width).then_some((field.name, index))
}

fn csv_err(path: &Path, source: csv::Error) -> SourceError {
    SourceError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
