use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{ImportError, Result};

/// Number of columns in a trace file: obstimei, lat, lng, spd
pub const SOURCE_COLUMN_COUNT: usize = 4;

/// One trace file and the vehicle it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleFile {
    pub vehicle_id: u32,
    pub path: PathBuf,
}

impl VehicleFile {
    pub fn new(data_dir: &Path, prefix: &str, vehicle_id: u32) -> Self {
        Self {
            vehicle_id,
            path: data_dir.join(file_name(prefix, vehicle_id)),
        }
    }
}

/// Shape of a trace file that passed inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvSummary {
    pub data_rows: u64,
}

// veh101.csv style name for a vehicle
pub fn file_name(prefix: &str, vehicle_id: u32) -> String {
    format!("{}{}.csv", prefix, vehicle_id)
}

// Pull the vehicle number back out of a file name, None if it doesn't follow the convention
pub fn parse_vehicle_id(file_name: &str, prefix: &str) -> Option<u32> {
    let digits = file_name.strip_prefix(prefix)?.strip_suffix(".csv")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Files for every vehicle in the range, in order. Existence is checked at import time.
pub fn vehicle_files_in_range(
    data_dir: &Path,
    prefix: &str,
    range: impl IntoIterator<Item = u32>,
) -> Vec<VehicleFile> {
    range
        .into_iter()
        .map(|vehicle_id| VehicleFile::new(data_dir, prefix, vehicle_id))
        .collect()
}

/// Scan the data directory for trace files, ordered by vehicle number
pub fn discover_vehicle_files(data_dir: &Path, prefix: &str) -> Result<Vec<VehicleFile>> {
    let entries = fs::read_dir(data_dir).map_err(|e| ImportError::io(data_dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ImportError::io(data_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_vehicle_id(name, prefix) {
            Some(vehicle_id) => files.push(VehicleFile { vehicle_id, path }),
            None => debug!("Skipping {}: not a vehicle trace file", path.display()),
        }
    }

    files.sort_by_key(|file| file.vehicle_id);
    Ok(files)
}

/// Check a trace file before it goes anywhere near the database.
/// Header row required, then four columns per record: integer epoch,
/// then lat, lng and speed as numbers.
pub fn inspect_csv(path: &Path) -> Result<CsvSummary> {
    if !path.is_file() {
        return Err(ImportError::MissingFile(path.to_path_buf()));
    }

    let invalid = |line: u64, reason: String| ImportError::InvalidCsv {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(true)
        .from_path(path)
        .map_err(|e| invalid(1, e.to_string()))?;

    let header_len = reader.headers().map_err(|e| invalid(1, e.to_string()))?.len();
    if header_len != SOURCE_COLUMN_COUNT {
        return Err(invalid(
            1,
            format!("expected {} columns, header has {}", SOURCE_COLUMN_COUNT, header_len),
        ));
    }

    let mut data_rows = 0;
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            invalid(line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(data_rows + 2);

        if record.len() != SOURCE_COLUMN_COUNT {
            return Err(invalid(
                line,
                format!("expected {} fields, found {}", SOURCE_COLUMN_COUNT, record.len()),
            ));
        }

        let epoch = record[0].trim();
        if epoch.parse::<i64>().is_err() {
            return Err(invalid(line, format!("epoch timestamp '{}' is not an integer", epoch)));
        }
        for (name, value) in ["lat", "lng", "spd"].iter().zip(record.iter().skip(1)) {
            if value.trim().parse::<f64>().is_err() {
                return Err(invalid(line, format!("{} '{}' is not a number", name, value)));
            }
        }

        data_rows += 1;
    }

    Ok(CsvSummary { data_rows })
}
